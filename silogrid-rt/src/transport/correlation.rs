// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use tokio::sync::oneshot;

// Layer 3: Internal module imports
use crate::message::Envelope;
use crate::util::MessageId;

/// Outstanding request table shared by every path of a transport.
///
/// Sending a request allocates an entry keyed by `message_id`; the first
/// response carrying that id completes and removes it. Abandoned entries
/// (timeout, caller cancellation) are removed by the sender; a late
/// response for a removed entry is dropped on the floor.
#[derive(Debug, Default)]
pub struct PendingRequests {
    entries: DashMap<MessageId, oneshot::Sender<Envelope>>,
}

impl PendingRequests {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the completion slot for a request.
    pub fn register(&self, message_id: MessageId) -> oneshot::Receiver<Envelope> {
        let (tx, rx) = oneshot::channel();
        self.entries.insert(message_id, tx);
        rx
    }

    /// Guard that removes the entry when the sender's await ends for any
    /// reason: response, timeout, or the caller dropping the future
    /// (cancellation). Removing an already-completed entry is a no-op.
    pub fn guard(&self, message_id: MessageId) -> PendingGuard<'_> {
        PendingGuard {
            table: self,
            message_id,
        }
    }

    /// Complete the matching entry with a response. Returns whether a
    /// waiter existed.
    pub fn complete(&self, response: Envelope) -> bool {
        match self.entries.remove(&response.message_id) {
            Some((_, tx)) => tx.send(response).is_ok(),
            None => false,
        }
    }

    /// Drop an entry without completing it (timeout or cancel).
    pub fn remove(&self, message_id: MessageId) -> bool {
        self.entries.remove(&message_id).is_some()
    }

    /// Drop every entry; waiters observe a closed channel.
    pub fn fail_all(&self) {
        self.entries.clear();
    }

    /// Outstanding request count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no request is outstanding.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// See [`PendingRequests::guard`].
pub struct PendingGuard<'a> {
    table: &'a PendingRequests,
    message_id: MessageId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.table.remove(self.message_id);
    }
}
