// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use bytes::Bytes;

// Layer 3: Internal module imports
use super::error::StorageError;

/// A committed `(payload, version)` tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedState {
    /// Serialized state bytes.
    pub payload: Bytes,

    /// Monotonically increasing version, starting at 1 on first insert.
    pub version: i64,
}

/// Per-provider persistence contract for named actor state.
///
/// Versions are monotonic per `(actor_id, state_name)`:
///
/// - `expected_version = None` and no row exists → insert at version 1;
/// - `expected_version = Some(v)` and the stored version is `v` → update
///   to `v + 1`;
/// - any other combination → [`StorageError::ConcurrencyConflict`].
///
/// The compare-and-set must be atomic on the key; any KV or relational
/// backend qualifies as long as it can provide that.
#[async_trait]
pub trait StateStorage: Send + Sync + 'static {
    /// Read the committed tuple, if any.
    async fn load(
        &self,
        actor_id: &str,
        state_name: &str,
    ) -> Result<Option<VersionedState>, StorageError>;

    /// Atomic conditional write. Returns the new version.
    async fn save_with_version(
        &self,
        actor_id: &str,
        state_name: &str,
        state: Bytes,
        expected_version: Option<i64>,
    ) -> Result<i64, StorageError>;

    /// Unconditional removal. Removing an absent row is not an error.
    async fn delete(&self, actor_id: &str, state_name: &str) -> Result<(), StorageError>;
}
