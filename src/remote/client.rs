use std::sync::Arc;
use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    form::outcome::RemoteOutcome,
    remote::{error::RemoteError, remote_model::ServerMessage},
    session::store::CookieSession,
};

pub const DEFAULT_AUTH_URL: &str = "http://localhost:8080";
pub const DEFAULT_SHORTENER_URL: &str = "http://localhost:8081";
pub const DEFAULT_HISTORY_URL: &str = "http://localhost:8082";

// ============================================================================
// Endpoints
// ============================================================================

/// Fully resolved URLs of every call the client makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub register: Url,
    pub login: Url,
    pub shorten: Url,
    pub history: Url,
}

impl Endpoints {
    /// Resolve the per-call URLs from the three service base URLs.
    pub fn from_bases(auth: &str, shortener: &str, history: &str) -> Result<Self, RemoteError> {
        Ok(Self {
            register: resolve("auth", auth, "register")?,
            login: resolve("auth", auth, "login")?,
            shorten: resolve("shortener", shortener, "create_short_url")?,
            history: resolve("history", history, "history")?,
        })
    }
}

fn resolve(service: &'static str, base: &str, path: &str) -> Result<Url, RemoteError> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|source| RemoteError::Endpoint {
        service,
        url: base.to_string(),
        source,
    })
}

// ============================================================================
// Replies and classification
// ============================================================================

/// What came back from one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// No response: refused connection, timeout, broken body.
    Unreachable,
    Answered { status: StatusCode, body: Vec<u8> },
}

/// The text a rejection shows: the body's `message`, else the raw body,
/// else the status line.
pub fn rejection_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ServerMessage>(body) {
        if !parsed.message.trim().is_empty() {
            return parsed.message;
        }
    }

    let text = String::from_utf8_lossy(body).trim().to_string();
    if !text.is_empty() {
        return text;
    }

    format!("Server responded with {}", status)
}

/// Classify a reply whose success body decodes into `T`.
pub fn classify<T: DeserializeOwned>(
    reply: Reply,
    context: &str,
) -> Result<RemoteOutcome<T>, RemoteError> {
    match reply {
        Reply::Unreachable => Ok(RemoteOutcome::TransportError),
        Reply::Answered { status, body } if status.is_success() => serde_json::from_slice(&body)
            .map(RemoteOutcome::Success)
            .map_err(|source| RemoteError::Decode {
                context: context.to_string(),
                source,
            }),
        Reply::Answered { status, body } => {
            Ok(RemoteOutcome::server_error(rejection_message(status, &body)))
        }
    }
}

/// Classify a reply whose success body is a `{"message": ...}` object,
/// yielding the message.
pub fn classify_message(reply: Reply, context: &str) -> Result<RemoteOutcome<String>, RemoteError> {
    classify::<ServerMessage>(reply, context).map(|outcome| outcome.map(|m| m.message))
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client for the auth, shortener and history services. Cookies set
/// by any of them land in the shared session.
pub struct ServiceClient {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl ServiceClient {
    pub fn new(
        endpoints: Endpoints,
        session: Arc<CookieSession>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .cookie_provider(session)
            .timeout(timeout)
            .build()
            .map_err(RemoteError::Client)?;
        Ok(Self { http, endpoints })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub async fn post_json<B: Serialize + ?Sized>(&self, url: &Url, body: &B) -> Reply {
        self.exchange(self.http.post(url.clone()).json(body)).await
    }

    pub async fn get(&self, url: &Url) -> Reply {
        self.exchange(self.http.get(url.clone())).await
    }

    async fn exchange(&self, request: RequestBuilder) -> Reply {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = ?e.url().map(Url::as_str), error = %e, "request did not reach the service");
                return Reply::Unreachable;
            }
        };

        let status = response.status();
        match response.bytes().await {
            Ok(body) => {
                debug!(%status, bytes = body.len(), "service answered");
                Reply::Answered {
                    status,
                    body: body.to_vec(),
                }
            }
            Err(e) => {
                warn!(%status, error = %e, "response body could not be read");
                Reply::Unreachable
            }
        }
    }
}
