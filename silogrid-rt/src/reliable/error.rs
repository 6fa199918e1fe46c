// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::util::MessageId;

/// Outbox/inbox failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReliableError {
    /// The referenced outbox row does not exist.
    #[error("outbox message not found: {0}")]
    NotFound(MessageId),

    /// Provider-specific failure.
    #[error("reliable store backend error: {0}")]
    Backend(String),

    /// Delivery attempt failed; recorded on the row for the next retry.
    #[error("delivery failed: {0}")]
    Delivery(String),
}
