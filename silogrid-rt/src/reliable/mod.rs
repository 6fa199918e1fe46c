//! Reliable-send outbox and idempotent-receive inbox.
//!
//! The outbox makes "mutate state, then send" atomic from the receiver's
//! point of view: the message row is durable before the state transition
//! commits, and a background drainer retries delivery until it sticks.
//! The inbox is the receiving half: processed message ids are recorded so
//! a redelivery becomes a no-op.

mod drainer;
mod error;
mod inbox;
mod outbox;

pub use drainer::{OutboxDeliver, OutboxDrainer};
pub use error::ReliableError;
pub use inbox::{InMemoryInbox, InboxStore};
pub use outbox::{InMemoryOutbox, OutboxMessage, OutboxStore};
