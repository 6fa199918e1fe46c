//! Retry schedule and dead-letter capture for failed turns.

mod queue;
mod retry;

pub use queue::{DeadLetter, DeadLetterQueue, DlqOptions};
pub use retry::RetryPolicy;
