use thiserror::Error;

/// Text shown when the remote action never got an answer from its service.
pub const TRANSPORT_MESSAGE: &str = "Couldn't reach server";

/// What a remote action resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome<P> {
    /// The service accepted the request.
    Success(P),
    /// The service answered with an explicit rejection.
    ServerError { message: String },
    /// The request never reached the service or was not answered.
    TransportError,
}

impl<P> RemoteOutcome<P> {
    pub fn server_error(message: impl Into<String>) -> Self {
        RemoteOutcome::ServerError {
            message: message.into(),
        }
    }

    pub fn map<Q>(self, f: impl FnOnce(P) -> Q) -> RemoteOutcome<Q> {
        match self {
            RemoteOutcome::Success(p) => RemoteOutcome::Success(f(p)),
            RemoteOutcome::ServerError { message } => RemoteOutcome::ServerError { message },
            RemoteOutcome::TransportError => RemoteOutcome::TransportError,
        }
    }

    /// Split into the payload or the error that ends the cycle.
    pub fn into_result(self) -> Result<P, SubmissionError> {
        match self {
            RemoteOutcome::Success(p) => Ok(p),
            RemoteOutcome::ServerError { message } => Err(SubmissionError::ServerRejection(message)),
            RemoteOutcome::TransportError => Err(SubmissionError::Transport),
        }
    }
}

/// Why a submit cycle ended in `Failed`. The `Display` output is the
/// user-facing error text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// Local rule violations; no request was sent.
    #[error("{}", .0.join("\n"))]
    Validation(Vec<String>),

    #[error("{}", TRANSPORT_MESSAGE)]
    Transport,

    /// The service's own message, verbatim.
    #[error("{0}")]
    ServerRejection(String),
}

impl SubmissionError {
    pub fn kind(&self) -> &'static str {
        match self {
            SubmissionError::Validation(_) => "validation",
            SubmissionError::Transport => "transport",
            SubmissionError::ServerRejection(_) => "server",
        }
    }

    /// Whether the remote action was invoked for this cycle.
    pub fn attempted_request(&self) -> bool {
        !matches!(self, SubmissionError::Validation(_))
    }
}
