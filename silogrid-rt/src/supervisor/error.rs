// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Supervisor operation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    /// A child with that id already exists under this parent.
    #[error("duplicate child id: {0}")]
    DuplicateChild(String),

    /// No child with that id exists under this parent.
    #[error("unknown child id: {0}")]
    UnknownChild(String),

    /// A (re)started child failed its start hook.
    #[error("child {id} failed to start: {message}")]
    StartFailed {
        /// Child id that failed.
        id: String,
        /// Start error text.
        message: String,
    },
}
