use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::{
    form::{form_model::FieldMap, outcome::RemoteOutcome},
    remote::{
        client::{ServiceClient, classify, classify_message},
        error::RemoteError,
        remote_model::{
            History, HistoryEntry, LoginRequest, RegisterRequest, RemoteAction, ShortenRequest,
        },
    },
    session::store::SessionStore,
    validate::forms::field,
};

// ============================================================================
// Auth service
// ============================================================================

/// `POST /register`. On success the service also sets the session cookies.
pub struct RegisterAction {
    client: Arc<ServiceClient>,
}

impl RegisterAction {
    pub fn new(client: Arc<ServiceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteAction for RegisterAction {
    type Payload = String;

    async fn perform(&self, fields: &FieldMap) -> Result<RemoteOutcome<String>, RemoteError> {
        let request = RegisterRequest {
            name: fields.get(field::NAME),
            email: fields.get(field::EMAIL),
            password: fields.get(field::PASSWORD),
        };
        info!(email = request.email, "registering account");
        let reply = self
            .client
            .post_json(&self.client.endpoints().register, &request)
            .await;
        classify_message(reply, "register")
    }
}

/// `POST /login`.
pub struct LoginAction {
    client: Arc<ServiceClient>,
}

impl LoginAction {
    pub fn new(client: Arc<ServiceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteAction for LoginAction {
    type Payload = String;

    async fn perform(&self, fields: &FieldMap) -> Result<RemoteOutcome<String>, RemoteError> {
        let request = LoginRequest {
            email: fields.get(field::EMAIL),
            password: fields.get(field::PASSWORD),
        };
        info!(email = request.email, "logging in");
        let reply = self
            .client
            .post_json(&self.client.endpoints().login, &request)
            .await;
        classify_message(reply, "login")
    }
}

// ============================================================================
// Shortener service
// ============================================================================

/// `POST /create_short_url`. Anonymous requests carry only the URL; a
/// logged-in user's request also carries the chosen expiration.
/// The success payload is the short URL.
pub struct ShortenAction {
    client: Arc<ServiceClient>,
    session: Arc<dyn SessionStore>,
}

impl ShortenAction {
    pub fn new(client: Arc<ServiceClient>, session: Arc<dyn SessionStore>) -> Self {
        Self { client, session }
    }
}

/// Expiration in days to send for this snapshot, if any.
pub fn requested_expiration(fields: &FieldMap, authenticated: bool) -> Option<u32> {
    if !authenticated {
        return None;
    }
    fields.get(field::EXPIRATION).trim().parse().ok()
}

#[async_trait]
impl RemoteAction for ShortenAction {
    type Payload = String;

    async fn perform(&self, fields: &FieldMap) -> Result<RemoteOutcome<String>, RemoteError> {
        let request = ShortenRequest {
            url: fields.get(field::URL),
            expiration: requested_expiration(fields, self.session.is_authenticated()),
        };
        info!(
            url = request.url,
            expiration = ?request.expiration,
            "requesting short url"
        );
        let reply = self
            .client
            .post_json(&self.client.endpoints().shorten, &request)
            .await;
        classify_message(reply, "create_short_url")
    }
}

// ============================================================================
// History service
// ============================================================================

/// `GET /history` for the logged-in user.
pub struct HistoryAction {
    client: Arc<ServiceClient>,
}

impl HistoryAction {
    pub fn new(client: Arc<ServiceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteAction for HistoryAction {
    type Payload = History;

    async fn perform(&self, _fields: &FieldMap) -> Result<RemoteOutcome<History>, RemoteError> {
        let reply = self.client.get(&self.client.endpoints().history).await;
        let outcome = classify::<Vec<HistoryEntry>>(reply, "history")?;
        Ok(outcome.map(History))
    }
}
