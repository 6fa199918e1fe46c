// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::message::{CallError, FramingError};

/// Failure modes of one dispatched invocation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// The dispatcher has no method with that name.
    #[error("unknown method {actor_type}::{method}")]
    UnknownMethod {
        /// The dispatcher's actor type.
        actor_type: String,
        /// The unresolved method name.
        method: String,
    },

    /// Parameter framing or converter violation.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// A specific caller-facing error to surface as-is, without the
    /// mailbox retry path (e.g. a concurrency conflict).
    #[error(transparent)]
    Surface(CallError),

    /// User code failed; the mailbox owns retry and dead-lettering.
    #[error("invocation failed: {0}")]
    Failed(String),
}

impl From<FramingError> for DispatchError {
    fn from(err: FramingError) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Registration-time failures of the write-once registries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The type name is already registered.
    #[error("duplicate registration for actor type {0}")]
    Duplicate(String),

    /// The registry was frozen; post-freeze writes fail loudly.
    #[error("registry is frozen")]
    Frozen,
}
