use shared::{MethodError, OutcomeError};

/// How an error should surface to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The server could not be reached or refused the request
    Transport,
    /// The server answered, but not with something we understand
    Protocol,
    /// Another submission is still pending
    Busy,
    /// Superseded by a newer request or a dismissed modal
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModalError {
    #[error("network error requesting {url}: {reason}")]
    Network { url: String, reason: String },
    #[error("request to {url} timed out after {timeout_ms} ms")]
    TimedOut { url: String, timeout_ms: u32 },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
    #[error("request to {url} was cancelled")]
    Cancelled { url: String },
    #[error(transparent)]
    Outcome(#[from] OutcomeError),
    #[error(transparent)]
    Method(#[from] MethodError),
    #[error("could not read form: {0}")]
    Form(String),
    #[error("a submission is already in flight")]
    SubmitInFlight,
}

impl ModalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModalError::Network { .. }
            | ModalError::TimedOut { .. }
            | ModalError::Status { .. } => {
                ErrorKind::Transport
            }
            ModalError::Decode { .. }
            | ModalError::Outcome(_)
            | ModalError::Method(_)
            | ModalError::Form(_) => ErrorKind::Protocol,
            ModalError::SubmitInFlight => ErrorKind::Busy,
            ModalError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }
}
