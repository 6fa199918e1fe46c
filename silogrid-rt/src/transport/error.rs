// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::message::CallError;
use crate::util::SiloId;

/// Transport-level failures.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The send deadline elapsed with no response.
    #[error("request timed out")]
    Timeout,

    /// The caller canceled the request.
    #[error("request canceled")]
    Canceled,

    /// No stream to the target silo exists.
    #[error("not connected to silo {0}")]
    NotConnected(SiloId),

    /// Dial or stream I/O failed.
    #[error("transport i/o error: {0}")]
    Io(String),

    /// An envelope failed to encode or decode.
    #[error("wire codec error: {0}")]
    Codec(String),

    /// No receiver is registered for local dispatch.
    #[error("no envelope receiver registered")]
    NoReceiver,

    /// The transport has been stopped.
    #[error("transport stopped")]
    Stopped,
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl TransportError {
    /// The caller-facing error kind for a failed `send`.
    pub fn as_call_error(&self) -> CallError {
        match self {
            Self::Timeout => CallError::Timeout,
            Self::Canceled => CallError::Canceled,
            other => CallError::ActorFailure(other.to_string()),
        }
    }
}
