use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    form::{form_model::FieldMap, outcome::RemoteOutcome},
    remote::error::RemoteError,
};

/// The one network call a form makes per submit cycle.
///
/// `Ok` carries the classified outcome. `Err` means the exchange could not
/// be classified at all.
#[async_trait]
pub trait RemoteAction: Send + Sync {
    type Payload: Clone + Send + Sync + 'static;

    async fn perform(&self, fields: &FieldMap)
    -> Result<RemoteOutcome<Self::Payload>, RemoteError>;
}

// ============================================================================
// Wire shapes
// ============================================================================

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ShortenRequest<'a> {
    pub url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<u32>,
}

/// Body of every auth/shortener response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerMessage {
    #[serde(default)]
    pub message: String,
}

/// One row of the profile history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub short_url: String,
    pub long_url: String,
    #[serde(default)]
    pub expiration_date: String,
}

/// Payload of the history view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History(pub Vec<HistoryEntry>);

impl History {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
