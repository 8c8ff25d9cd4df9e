#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;

use shortlink_client::form::form_model::{FieldMap, Phase, StateSnapshot};
use shortlink_client::form::outcome::RemoteOutcome;
use shortlink_client::remote::error::RemoteError;
use shortlink_client::remote::remote_model::RemoteAction;
use shortlink_client::session::store::SessionStore;

// ============================================================================
// Scripted remote action
// ============================================================================

struct ScriptInner<P> {
    outcome: Mutex<RemoteOutcome<P>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<FieldMap>>,
    gate: Option<Notify>,
}

/// Remote action that resolves to a preset outcome and records every
/// snapshot it was called with. Clones share the same script.
pub struct ScriptedAction<P> {
    inner: Arc<ScriptInner<P>>,
}

impl<P> Clone for ScriptedAction<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P: Clone + Send + Sync + 'static> ScriptedAction<P> {
    pub fn resolving(outcome: RemoteOutcome<P>) -> Self {
        Self::build(outcome, None)
    }

    /// Like `resolving`, but each call waits for one `release()`.
    pub fn gated(outcome: RemoteOutcome<P>) -> Self {
        Self::build(outcome, Some(Notify::new()))
    }

    fn build(outcome: RemoteOutcome<P>, gate: Option<Notify>) -> Self {
        Self {
            inner: Arc::new(ScriptInner {
                outcome: Mutex::new(outcome),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                gate,
            }),
        }
    }

    pub fn set_outcome(&self, outcome: RemoteOutcome<P>) {
        *self.inner.outcome.lock() = outcome;
    }

    pub fn release(&self) {
        if let Some(gate) = &self.inner.gate {
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<FieldMap> {
        self.inner.seen.lock().clone()
    }
}

#[async_trait]
impl<P: Clone + Send + Sync + 'static> RemoteAction for ScriptedAction<P> {
    type Payload = P;

    async fn perform(&self, fields: &FieldMap) -> Result<RemoteOutcome<P>, RemoteError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.seen.lock().push(fields.clone());
        if let Some(gate) = &self.inner.gate {
            gate.notified().await;
        }
        Ok(self.inner.outcome.lock().clone())
    }
}

/// Remote action that panics mid-call.
pub struct PanickingAction;

#[async_trait]
impl RemoteAction for PanickingAction {
    type Payload = String;

    async fn perform(&self, _fields: &FieldMap) -> Result<RemoteOutcome<String>, RemoteError> {
        panic!("remote action blew up");
    }
}

/// Remote action that cannot classify the exchange.
pub struct UndecodableAction;

#[async_trait]
impl RemoteAction for UndecodableAction {
    type Payload = String;

    async fn perform(&self, _fields: &FieldMap) -> Result<RemoteOutcome<String>, RemoteError> {
        let source = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        Err(RemoteError::Decode {
            context: "test".into(),
            source,
        })
    }
}

// ============================================================================
// Session stub
// ============================================================================

#[derive(Default)]
pub struct StubSession {
    authenticated: AtomicBool,
}

impl StubSession {
    pub fn logged_in() -> Arc<Self> {
        let session = Self::default();
        session.authenticated.store(true, Ordering::SeqCst);
        Arc::new(session)
    }

    pub fn anonymous() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl SessionStore for StubSession {
    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.authenticated.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn fields(pairs: &[(&str, &str)]) -> FieldMap {
    pairs.iter().copied().collect()
}

pub async fn wait_for_phase<P>(updates: &mut watch::Receiver<StateSnapshot<P>>, phase: Phase) {
    updates
        .wait_for(|snapshot| snapshot.phase == phase)
        .await
        .expect("controller dropped");
}

// ============================================================================
// One-shot HTTP responder
// ============================================================================

/// Serve exactly one HTTP response on a local port. The join handle yields
/// the raw request text.
pub async fn serve_once(
    status: &str,
    headers: &[&str],
    body: &str,
) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let extra: String = headers.iter().map(|h| format!("{}\r\n", h)).collect();
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
        status,
        body.len(),
        extra,
        body
    );

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });

    (format!("http://{}", addr), handle)
}

/// Base URL of a port nothing listens on.
pub async fn dead_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).to_string()
}
