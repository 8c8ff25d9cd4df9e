use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::form::{
    form_model::{FieldMap, Phase},
    outcome::SubmissionError,
};

/// One line of the transition journal.
///
/// Field values are never written; `fields_digest` identifies the snapshot
/// a cycle ran with.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub form: String,
    pub cycle: u64,

    pub phase: String,
    pub event: String,

    pub fields_digest: Option<String>,
    pub error_kind: Option<String>,
    pub error: Option<String>,
}

impl TraceEvent {
    pub fn now(form: &str, cycle: u64, phase: Phase) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            form: form.to_string(),
            cycle,
            phase: phase.to_string(),
            event: String::new(),
            fields_digest: None,
            error_kind: None,
            error: None,
        }
    }

    pub fn with_event(mut self, event: impl ToString) -> Self {
        self.event = event.to_string();
        self
    }

    pub fn with_fields(mut self, fields: &FieldMap) -> Self {
        self.fields_digest = Some(fields_digest(fields));
        self
    }

    pub fn with_error(mut self, error: &SubmissionError) -> Self {
        self.error_kind = Some(error.kind().to_string());
        self.error = Some(error.to_string());
        self
    }
}

pub fn text_fingerprint(text: &str) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Fingerprint of a whole field snapshot, stable across runs.
pub fn fields_digest(fields: &FieldMap) -> String {
    let joined = fields
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("\u{1f}");
    text_fingerprint(&joined)
}
