// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::message::CallError;

/// Why a `post` did not enqueue the message.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostError {
    /// The circuit breaker is open; the mailbox fails fast.
    #[error("circuit open")]
    CircuitOpen,

    /// The rate limiter rejected the message (excess action `Reject`).
    #[error("rate limited")]
    RateLimited,

    /// The message was silently discarded (rate-limit `Drop`, or a full
    /// queue in `DropNewest` mode). No response will be produced.
    #[error("message dropped")]
    Dropped,

    /// The mailbox has been stopped.
    #[error("mailbox closed")]
    Closed,
}

impl PostError {
    /// The caller-facing error kind, when one should be surfaced.
    ///
    /// `Dropped` intentionally has none: a silent drop produces no
    /// response and the caller times out.
    pub fn as_call_error(&self) -> Option<CallError> {
        match self {
            Self::CircuitOpen => Some(CallError::CircuitOpen),
            Self::RateLimited => Some(CallError::RateLimited),
            Self::Closed => Some(CallError::ActorFailure("activation stopped".to_string())),
            Self::Dropped => None,
        }
    }
}
