// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

// Layer 3: Internal module imports
use super::error::PostError;
use super::metrics::MailboxMetrics;
use crate::message::Envelope;

/// What a producer experiences when the queue is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FullMode {
    /// Wait asynchronously until the consumer makes room.
    #[default]
    Wait,

    /// Evict the oldest queued message and accept the new one.
    DropOldest,

    /// Discard the incoming message.
    DropNewest,
}

/// Bounded single-consumer FIFO of envelopes.
///
/// The deque is guarded by a mutex held only for O(1) operations; the
/// capacity lives in an atomic so adaptive sizing can change it without
/// swapping the queue; messages already queued beyond a shrunken
/// capacity simply drain out.
#[derive(Debug)]
pub struct TurnQueue {
    inner: Mutex<VecDeque<Envelope>>,
    capacity: AtomicUsize,
    full_mode: FullMode,
    consumer_wake: Notify,
    space_wake: Notify,
    closed: AtomicBool,
    metrics: Arc<MailboxMetrics>,
}

impl TurnQueue {
    /// Create a queue with the given capacity and full-mode policy.
    pub fn new(capacity: usize, full_mode: FullMode, metrics: Arc<MailboxMetrics>) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            capacity: AtomicUsize::new(capacity.max(1)),
            full_mode,
            consumer_wake: Notify::new(),
            space_wake: Notify::new(),
            closed: AtomicBool::new(false),
            metrics,
        }
    }

    /// Enqueue an envelope, applying the full-mode policy at capacity.
    pub async fn push(&self, envelope: Envelope) -> Result<(), PostError> {
        let mut envelope = Some(envelope);
        loop {
            // Arm the notification before checking, so a consumer that
            // frees a slot between the check and the await still wakes us.
            let space = self.space_wake.notified();

            {
                let mut queue = self.inner.lock();
                if self.closed.load(Ordering::Acquire) {
                    return Err(PostError::Closed);
                }
                let capacity = self.capacity.load(Ordering::Acquire);
                if queue.len() < capacity {
                    if let Some(env) = envelope.take() {
                        queue.push_back(env);
                    }
                    self.metrics.record_enqueued();
                    self.consumer_wake.notify_one();
                    return Ok(());
                }
                match self.full_mode {
                    FullMode::DropNewest => {
                        self.metrics.record_dropped();
                        return Err(PostError::Dropped);
                    }
                    FullMode::DropOldest => {
                        queue.pop_front();
                        self.metrics.record_dropped();
                        if let Some(env) = envelope.take() {
                            queue.push_back(env);
                        }
                        self.metrics.record_enqueued();
                        self.consumer_wake.notify_one();
                        return Ok(());
                    }
                    FullMode::Wait => {}
                }
            }

            space.await;
        }
    }

    /// Dequeue the next envelope, or `None` once closed and drained.
    pub async fn recv(&self) -> Option<Envelope> {
        loop {
            let wake = self.consumer_wake.notified();

            {
                let mut queue = self.inner.lock();
                if let Some(envelope) = queue.pop_front() {
                    self.space_wake.notify_one();
                    return Some(envelope);
                }
                if self.closed.load(Ordering::Acquire) {
                    return None;
                }
            }

            wake.await;
        }
    }

    /// Stop accepting messages; queued messages remain receivable.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.consumer_wake.notify_waiters();
        self.space_wake.notify_waiters();
    }

    /// Whether the queue refuses new messages.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Messages currently queued.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Current capacity.
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Acquire)
    }

    /// Adjust capacity in place (clamped to at least 1).
    ///
    /// Growing wakes blocked producers; shrinking below the current queue
    /// length lets the backlog drain naturally.
    pub fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity.max(1), Ordering::Release);
        self.space_wake.notify_waiters();
    }
}
