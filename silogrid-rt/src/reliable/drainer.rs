// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::error::ReliableError;
use super::outbox::{OutboxMessage, OutboxStore};

/// Delivery function the drainer calls per due row.
#[async_trait]
pub trait OutboxDeliver: Send + Sync + 'static {
    /// Attempt to deliver one message. An error schedules a retry.
    async fn deliver(&self, message: &OutboxMessage) -> Result<(), ReliableError>;
}

/// Background loop wiring an [`OutboxStore`] to a delivery function.
///
/// Each tick reads a batch of due rows, attempts delivery, marks the
/// outcome and purges sent rows past retention. Rows that exhausted their
/// retry budget stay parked in the store for inspection.
pub struct OutboxDrainer {
    store: Arc<dyn OutboxStore>,
    deliver: Arc<dyn OutboxDeliver>,
    poll_interval: Duration,
    batch_size: usize,
    retention: Duration,
    cancel: CancellationToken,
}

impl OutboxDrainer {
    /// Build a drainer; `start` spawns the loop.
    pub fn new(
        store: Arc<dyn OutboxStore>,
        deliver: Arc<dyn OutboxDeliver>,
        poll_interval: Duration,
        batch_size: usize,
        retention: Duration,
    ) -> Self {
        Self {
            store,
            deliver,
            poll_interval,
            batch_size,
            retention,
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn the drain loop.
    pub fn start(&self) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let deliver = Arc::clone(&self.deliver);
        let poll_interval = self.poll_interval;
        let batch_size = self.batch_size;
        let retention = self.retention;
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                Self::drain_once(&*store, &*deliver, batch_size).await;
                if let Err(err) = store.purge_sent_older_than(retention).await {
                    warn!(error = %err, "outbox purge failed");
                }
            }
        })
    }

    /// Request the loop to stop after the current tick.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    async fn drain_once(store: &dyn OutboxStore, deliver: &dyn OutboxDeliver, batch: usize) {
        let due = match store.pending(batch).await {
            Ok(due) => due,
            Err(err) => {
                warn!(error = %err, "outbox pending query failed");
                return;
            }
        };

        for message in due {
            match deliver.deliver(&message).await {
                Ok(()) => {
                    debug!(message_id = %message.message_id, destination = %message.destination,
                           "outbox delivered");
                    if let Err(err) = store.mark_sent(message.message_id).await {
                        warn!(error = %err, "outbox mark_sent failed");
                    }
                }
                Err(err) => {
                    warn!(message_id = %message.message_id, error = %err,
                          "outbox delivery failed");
                    if let Err(err) = store.mark_failed(message.message_id, &err.to_string()).await
                    {
                        warn!(error = %err, "outbox mark_failed failed");
                    }
                }
            }
        }
    }
}
