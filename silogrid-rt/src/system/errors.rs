//! Silo-level error types.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::dispatch::RegistryError;
use crate::transport::TransportError;

/// Silo lifecycle and management failures.
///
/// Call-path failures travel as [`CallError`](crate::message::CallError)
/// inside response envelopes; this enum covers the operations around
/// them (startup, registration, queries, shutdown).
#[derive(Error, Debug)]
pub enum SiloError {
    /// Configuration validation failed.
    #[error("configuration error: {0}")]
    Config(String),

    /// A registry write was rejected.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The transport failed to start, stop or connect.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A metadata query carried an invalid pattern or page.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The silo is shutting down and refuses new work.
    #[error("silo shutdown in progress")]
    ShuttingDown,

    /// Shutdown could not drain all activations in time.
    #[error("shutdown drain exceeded {0:?}")]
    ShutdownTimeout(Duration),
}

impl SiloError {
    /// Whether the silo must stop after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ShuttingDown | Self::ShutdownTimeout(_))
    }

    /// Whether the operation may be retried as-is.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(SiloError::ShuttingDown.is_fatal());
        assert!(SiloError::ShutdownTimeout(Duration::from_secs(30)).is_fatal());
        assert!(!SiloError::Config("x".to_string()).is_fatal());

        assert!(SiloError::Transport(TransportError::Timeout).is_transient());
        assert!(!SiloError::InvalidQuery("x".to_string()).is_transient());
    }

    #[test]
    fn test_registry_error_converts() {
        let err: SiloError = RegistryError::Frozen.into();
        assert!(matches!(err, SiloError::Registry(RegistryError::Frozen)));
    }
}
