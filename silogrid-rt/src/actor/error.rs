// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::storage::StorageError;

/// Failures of user actor code, bubbled as values to the mailbox loop
/// and supervisors (never as panics across the mailbox boundary).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActorError {
    /// A method invocation failed.
    #[error("{0}")]
    Failure(String),

    /// `on_activate` failed; the activation never started.
    #[error("activation failed: {0}")]
    ActivationFailed(String),

    /// `on_deactivate` failed; resources may not have been released.
    #[error("deactivation failed: {0}")]
    DeactivationFailed(String),

    /// State persistence failed inside a turn.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ActorError {
    /// Shorthand for a plain failure message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }
}
