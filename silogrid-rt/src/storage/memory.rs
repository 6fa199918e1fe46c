// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

// Layer 3: Internal module imports
use super::error::StorageError;
use super::traits::{StateStorage, VersionedState};

/// In-memory state storage.
///
/// The compare-and-set rides on DashMap's per-entry exclusive access:
/// the entry lock is held across the version check and the write, so two
/// concurrent conditional writes against the same key serialize and
/// exactly one succeeds.
#[derive(Debug, Default)]
pub struct InMemoryStateStorage {
    rows: DashMap<(String, String), VersionedState>,
}

impl InMemoryStateStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no row is stored.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl StateStorage for InMemoryStateStorage {
    async fn load(
        &self,
        actor_id: &str,
        state_name: &str,
    ) -> Result<Option<VersionedState>, StorageError> {
        Ok(self
            .rows
            .get(&(actor_id.to_string(), state_name.to_string()))
            .map(|row| row.clone()))
    }

    async fn save_with_version(
        &self,
        actor_id: &str,
        state_name: &str,
        state: Bytes,
        expected_version: Option<i64>,
    ) -> Result<i64, StorageError> {
        let key = (actor_id.to_string(), state_name.to_string());
        match self.rows.entry(key) {
            dashmap::mapref::entry::Entry::Vacant(entry) => match expected_version {
                None => {
                    entry.insert(VersionedState {
                        payload: state,
                        version: 1,
                    });
                    Ok(1)
                }
                Some(expected) => Err(StorageError::ConcurrencyConflict {
                    expected: Some(expected),
                    actual: None,
                }),
            },
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                let current = entry.get().version;
                match expected_version {
                    Some(expected) if expected == current => {
                        let next = current + 1;
                        entry.insert(VersionedState {
                            payload: state,
                            version: next,
                        });
                        Ok(next)
                    }
                    expected => Err(StorageError::ConcurrencyConflict {
                        expected,
                        actual: Some(current),
                    }),
                }
            }
        }
    }

    async fn delete(&self, actor_id: &str, state_name: &str) -> Result<(), StorageError> {
        self.rows
            .remove(&(actor_id.to_string(), state_name.to_string()));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_insert_starts_at_version_one() {
        let store = InMemoryStateStorage::new();

        let v = store
            .save_with_version("o1", "order", Bytes::from_static(b"A"), None)
            .await
            .unwrap();
        assert_eq!(v, 1);

        let row = store.load("o1", "order").await.unwrap().unwrap();
        assert_eq!(row.payload, Bytes::from_static(b"A"));
        assert_eq!(row.version, 1);
    }

    #[tokio::test]
    async fn test_conditional_update_increments() {
        let store = InMemoryStateStorage::new();
        store
            .save_with_version("o1", "order", Bytes::from_static(b"A"), None)
            .await
            .unwrap();

        let v = store
            .save_with_version("o1", "order", Bytes::from_static(b"B"), Some(1))
            .await
            .unwrap();
        assert_eq!(v, 2);

        let row = store.load("o1", "order").await.unwrap().unwrap();
        assert_eq!(row.payload, Bytes::from_static(b"B"));
        assert_eq!(row.version, 2);
    }

    #[tokio::test]
    async fn test_stale_writer_conflicts() {
        let store = InMemoryStateStorage::new();
        store
            .save_with_version("o1", "order", Bytes::from_static(b"A"), None)
            .await
            .unwrap();
        store
            .save_with_version("o1", "order", Bytes::from_static(b"B"), Some(1))
            .await
            .unwrap();

        // Writer Y still believes version 1.
        let err = store
            .save_with_version("o1", "order", Bytes::from_static(b"C"), Some(1))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StorageError::ConcurrencyConflict {
                expected: Some(1),
                actual: Some(2),
            }
        );

        // The losing write left no trace.
        let row = store.load("o1", "order").await.unwrap().unwrap();
        assert_eq!(row.payload, Bytes::from_static(b"B"));
        assert_eq!(row.version, 2);
    }

    #[tokio::test]
    async fn test_insert_over_existing_row_conflicts() {
        let store = InMemoryStateStorage::new();
        store
            .save_with_version("o1", "order", Bytes::from_static(b"A"), None)
            .await
            .unwrap();

        let err = store
            .save_with_version("o1", "order", Bytes::from_static(b"B"), None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StorageError::ConcurrencyConflict {
                expected: None,
                actual: Some(1),
            }
        );
    }

    #[tokio::test]
    async fn test_update_on_absent_row_conflicts() {
        let store = InMemoryStateStorage::new();

        let err = store
            .save_with_version("o1", "order", Bytes::from_static(b"A"), Some(3))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StorageError::ConcurrencyConflict {
                expected: Some(3),
                actual: None,
            }
        );
    }

    #[tokio::test]
    async fn test_delete_is_unconditional() {
        let store = InMemoryStateStorage::new();
        store
            .save_with_version("o1", "order", Bytes::from_static(b"A"), None)
            .await
            .unwrap();

        store.delete("o1", "order").await.unwrap();
        assert!(store.load("o1", "order").await.unwrap().is_none());

        // Deleting again is fine.
        store.delete("o1", "order").await.unwrap();
    }

    #[tokio::test]
    async fn test_state_names_are_isolated() {
        let store = InMemoryStateStorage::new();
        store
            .save_with_version("o1", "order", Bytes::from_static(b"A"), None)
            .await
            .unwrap();
        store
            .save_with_version("o1", "audit", Bytes::from_static(b"B"), None)
            .await
            .unwrap();

        assert_eq!(store.len(), 2);
        let order = store.load("o1", "order").await.unwrap().unwrap();
        let audit = store.load("o1", "audit").await.unwrap().unwrap();
        assert_eq!(order.payload, Bytes::from_static(b"A"));
        assert_eq!(audit.payload, Bytes::from_static(b"B"));
    }

    #[tokio::test]
    async fn test_concurrent_cas_single_winner() {
        let store = Arc::new(InMemoryStateStorage::new());
        store
            .save_with_version("o1", "order", Bytes::from_static(b"A"), None)
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for i in 0..8u8 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store
                    .save_with_version("o1", "order", Bytes::from(vec![i]), Some(1))
                    .await
            }));
        }

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);

        let row = store.load("o1", "order").await.unwrap().unwrap();
        assert_eq!(row.version, 2);
    }
}
