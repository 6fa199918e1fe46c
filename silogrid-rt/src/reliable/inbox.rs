// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

// Layer 3: Internal module imports
use super::error::ReliableError;
use crate::util::MessageId;

/// Idempotency log for at-least-once delivery.
///
/// The application pattern is: check [`InboxStore::is_processed`] first;
/// if true, return the previous (or empty) result without side effects;
/// otherwise handle the message and [`InboxStore::mark_processed`] inside
/// the same transaction as the state mutation.
#[async_trait]
pub trait InboxStore: Send + Sync + 'static {
    /// Whether the actor already processed this message.
    async fn is_processed(
        &self,
        actor_id: &str,
        message_id: MessageId,
    ) -> Result<bool, ReliableError>;

    /// Record the message as processed. Marking twice is a no-op.
    async fn mark_processed(
        &self,
        actor_id: &str,
        message_id: MessageId,
    ) -> Result<(), ReliableError>;

    /// Bulk-remove entries older than the retention window. Returns how many.
    async fn purge_older_than(&self, retention: Duration) -> Result<usize, ReliableError>;
}

/// In-memory inbox store.
#[derive(Debug, Default)]
pub struct InMemoryInbox {
    entries: DashMap<(String, MessageId), DateTime<Utc>>,
}

impl InMemoryInbox {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry is recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl InboxStore for InMemoryInbox {
    async fn is_processed(
        &self,
        actor_id: &str,
        message_id: MessageId,
    ) -> Result<bool, ReliableError> {
        Ok(self
            .entries
            .contains_key(&(actor_id.to_string(), message_id)))
    }

    async fn mark_processed(
        &self,
        actor_id: &str,
        message_id: MessageId,
    ) -> Result<(), ReliableError> {
        self.entries
            .entry((actor_id.to_string(), message_id))
            .or_insert_with(Utc::now);
        Ok(())
    }

    async fn purge_older_than(&self, retention: Duration) -> Result<usize, ReliableError> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(retention)
                .map_err(|e| ReliableError::Backend(e.to_string()))?;
        let before = self.entries.len();
        self.entries.retain(|_, processed_at| *processed_at > cutoff);
        Ok(before - self.entries.len())
    }
}
