use thiserror::Error;

/// Failures of the HTTP plumbing itself. A remote action returning one of
/// these is an unexpected rejection; the controller treats it as a
/// transport failure.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("invalid {service} endpoint '{url}': {source}")]
    Endpoint {
        service: &'static str,
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("unexpected response body ({context}): {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
