// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::message::CallError;

/// State storage failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// The conditional write found a different version than expected.
    ///
    /// Callers are expected to re-read and retry.
    #[error("concurrency conflict: expected {expected:?}, actual {actual:?}")]
    ConcurrencyConflict {
        /// Version the writer expected (`None` = expected no row).
        expected: Option<i64>,
        /// Version actually stored (`None` = no row).
        actual: Option<i64>,
    },

    /// Provider-specific failure (connection loss, I/O, serialization).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StorageError> for CallError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConcurrencyConflict { expected, actual } => {
                CallError::ConcurrencyConflict { expected, actual }
            }
            StorageError::Backend(msg) => CallError::ActorFailure(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_maps_to_call_error() {
        let err: CallError = StorageError::ConcurrencyConflict {
            expected: Some(1),
            actual: Some(2),
        }
        .into();

        assert_eq!(
            err,
            CallError::ConcurrencyConflict {
                expected: Some(1),
                actual: Some(2),
            }
        );
    }

    #[test]
    fn test_backend_maps_to_actor_failure() {
        let err: CallError = StorageError::Backend("down".into()).into();
        assert!(matches!(err, CallError::ActorFailure(_)));
    }
}
