// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use super::error::ReliableError;
use crate::util::MessageId;

/// One reliable-send row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxMessage {
    /// Unique id; the receiver's inbox dedupes on it.
    pub message_id: MessageId,

    /// Actor whose state transition this send belongs to.
    pub actor_id: String,

    /// Logical destination (actor identity, topic, queue name).
    pub destination: String,

    /// Application-level message type tag.
    pub message_type: String,

    /// Opaque message bytes.
    pub payload: Bytes,

    /// When the row was enqueued.
    pub created_at: DateTime<Utc>,

    /// Populated once delivery succeeded.
    pub sent_at: Option<DateTime<Utc>>,

    /// Failed delivery attempts so far.
    pub retry_count: u32,

    /// Attempt budget; the row parks once exceeded.
    pub max_retries: u32,

    /// Last delivery error, for diagnostics.
    pub last_error: Option<String>,

    /// Earliest next attempt (exponential backoff).
    pub next_retry_at: Option<DateTime<Utc>>,
}

impl OutboxMessage {
    /// Build a fresh row with the default retry budget of 3.
    pub fn new(
        actor_id: impl Into<String>,
        destination: impl Into<String>,
        message_type: impl Into<String>,
        payload: Bytes,
    ) -> Self {
        Self {
            message_id: MessageId::new(),
            actor_id: actor_id.into(),
            destination: destination.into(),
            message_type: message_type.into(),
            payload,
            created_at: Utc::now(),
            sent_at: None,
            retry_count: 0,
            max_retries: 3,
            last_error: None,
            next_retry_at: None,
        }
    }

    /// Builder method: override the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Whether the drainer should pick this row up at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.sent_at.is_none()
            && self.retry_count < self.max_retries
            && self.next_retry_at.map_or(true, |at| at <= now)
    }
}

/// Durable store backing the outbox.
///
/// `enqueue` must be durable before the caller's state transition is
/// considered committed; where the backend supports transactions the two
/// writes belong in one.
#[async_trait]
pub trait OutboxStore: Send + Sync + 'static {
    /// Persist a new row.
    async fn enqueue(&self, message: OutboxMessage) -> Result<(), ReliableError>;

    /// Rows due for delivery: unsent, retries left, past their backoff.
    async fn pending(&self, batch: usize) -> Result<Vec<OutboxMessage>, ReliableError>;

    /// Record a successful delivery.
    async fn mark_sent(&self, message_id: MessageId) -> Result<(), ReliableError>;

    /// Record a failed attempt; schedules the next retry at
    /// `now + 2^retry_count` seconds.
    async fn mark_failed(&self, message_id: MessageId, error: &str) -> Result<(), ReliableError>;

    /// Remove sent rows older than the retention window. Returns how many.
    async fn purge_sent_older_than(&self, retention: Duration) -> Result<usize, ReliableError>;
}

/// In-memory outbox store.
#[derive(Debug, Default)]
pub struct InMemoryOutbox {
    rows: DashMap<MessageId, OutboxMessage>,
}

impl InMemoryOutbox {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total rows, sent included.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no row is stored.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fetch one row (diagnostics and tests).
    pub fn get(&self, message_id: MessageId) -> Option<OutboxMessage> {
        self.rows.get(&message_id).map(|r| r.clone())
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutbox {
    async fn enqueue(&self, message: OutboxMessage) -> Result<(), ReliableError> {
        self.rows.insert(message.message_id, message);
        Ok(())
    }

    async fn pending(&self, batch: usize) -> Result<Vec<OutboxMessage>, ReliableError> {
        let now = Utc::now();
        let mut due: Vec<OutboxMessage> = self
            .rows
            .iter()
            .filter(|row| row.is_due(now))
            .map(|row| row.clone())
            .collect();
        due.sort_by_key(|m| m.created_at);
        due.truncate(batch);
        Ok(due)
    }

    async fn mark_sent(&self, message_id: MessageId) -> Result<(), ReliableError> {
        let mut row = self
            .rows
            .get_mut(&message_id)
            .ok_or(ReliableError::NotFound(message_id))?;
        row.sent_at = Some(Utc::now());
        Ok(())
    }

    async fn mark_failed(&self, message_id: MessageId, error: &str) -> Result<(), ReliableError> {
        let mut row = self
            .rows
            .get_mut(&message_id)
            .ok_or(ReliableError::NotFound(message_id))?;
        row.retry_count += 1;
        row.last_error = Some(error.to_string());
        let backoff_secs = 2i64.saturating_pow(row.retry_count.min(30));
        row.next_retry_at = Some(Utc::now() + chrono::Duration::seconds(backoff_secs));
        Ok(())
    }

    async fn purge_sent_older_than(&self, retention: Duration) -> Result<usize, ReliableError> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(retention)
                .map_err(|e| ReliableError::Backend(e.to_string()))?;
        let before = self.rows.len();
        self.rows
            .retain(|_, row| row.sent_at.map_or(true, |at| at > cutoff));
        Ok(before - self.rows.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn message(actor: &str) -> OutboxMessage {
        OutboxMessage::new(actor, "Billing/invoices", "order-shipped", Bytes::from_static(b"{}"))
    }

    #[tokio::test]
    async fn test_enqueue_then_pending() {
        let outbox = InMemoryOutbox::new();
        let msg = message("o1");
        let id = msg.message_id;

        outbox.enqueue(msg).await.unwrap();

        let pending = outbox.pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].message_id, id);
    }

    #[tokio::test]
    async fn test_sent_rows_leave_pending() {
        let outbox = InMemoryOutbox::new();
        let msg = message("o1");
        let id = msg.message_id;
        outbox.enqueue(msg).await.unwrap();

        outbox.mark_sent(id).await.unwrap();

        assert!(outbox.pending(10).await.unwrap().is_empty());
        assert!(outbox.get(id).unwrap().sent_at.is_some());
    }

    #[tokio::test]
    async fn test_failure_schedules_backoff() {
        let outbox = InMemoryOutbox::new();
        let msg = message("o1");
        let id = msg.message_id;
        outbox.enqueue(msg).await.unwrap();

        outbox.mark_failed(id, "connection refused").await.unwrap();

        let row = outbox.get(id).unwrap();
        assert_eq!(row.retry_count, 1);
        assert_eq!(row.last_error.as_deref(), Some("connection refused"));
        let delay = row.next_retry_at.unwrap() - Utc::now();
        // 2^1 seconds, minus the time this test took.
        assert!(delay > chrono::Duration::seconds(1));
        assert!(delay <= chrono::Duration::seconds(2));

        // Backed-off rows are not yet due.
        assert!(outbox.pending(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_rows_leave_pending() {
        let outbox = InMemoryOutbox::new();
        let msg = message("o1").with_max_retries(2);
        let id = msg.message_id;
        outbox.enqueue(msg).await.unwrap();

        outbox.mark_failed(id, "e1").await.unwrap();
        outbox.mark_failed(id, "e2").await.unwrap();

        let row = outbox.get(id).unwrap();
        assert_eq!(row.retry_count, 2);
        assert!(!row.is_due(Utc::now() + chrono::Duration::days(1)));
    }

    #[tokio::test]
    async fn test_pending_batches_oldest_first() {
        let outbox = InMemoryOutbox::new();
        let mut first = message("o1");
        first.created_at = Utc::now() - chrono::Duration::seconds(60);
        let first_id = first.message_id;
        outbox.enqueue(first).await.unwrap();
        outbox.enqueue(message("o2")).await.unwrap();
        outbox.enqueue(message("o3")).await.unwrap();

        let batch = outbox.pending(1).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].message_id, first_id);
    }

    #[tokio::test]
    async fn test_purge_removes_only_old_sent_rows() {
        let outbox = InMemoryOutbox::new();
        let sent_old = message("o1");
        let sent_old_id = sent_old.message_id;
        outbox.enqueue(sent_old).await.unwrap();
        outbox.mark_sent(sent_old_id).await.unwrap();
        // Backdate the sent timestamp past the retention window.
        outbox.rows.get_mut(&sent_old_id).unwrap().sent_at =
            Some(Utc::now() - chrono::Duration::hours(2));

        let unsent = message("o2");
        let unsent_id = unsent.message_id;
        outbox.enqueue(unsent).await.unwrap();

        let purged = outbox
            .purge_sent_older_than(Duration::from_secs(3600))
            .await
            .unwrap();

        assert_eq!(purged, 1);
        assert!(outbox.get(sent_old_id).is_none());
        assert!(outbox.get(unsent_id).is_some());
    }

    #[tokio::test]
    async fn test_mark_unknown_row_errors() {
        let outbox = InMemoryOutbox::new();
        let id = MessageId::new();

        assert_eq!(
            outbox.mark_sent(id).await.unwrap_err(),
            ReliableError::NotFound(id)
        );
        assert_eq!(
            outbox.mark_failed(id, "x").await.unwrap_err(),
            ReliableError::NotFound(id)
        );
    }
}
