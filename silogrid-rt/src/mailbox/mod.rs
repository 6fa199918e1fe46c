//! Per-activation mailbox: bounded FIFO, single-consumer turn loop, and
//! the cross-cutting admission behaviors (adaptive sizing, circuit
//! breaker, rate limiting).
//!
//! The mailbox enforces the turn-based invariant: exactly one message of
//! an activation is in flight at any instant. Producers observe FIFO
//! order per producer; cross-producer interleaving is nondeterministic.

mod adaptive;
mod bounded;
mod breaker;
mod error;
mod metrics;
mod queue;
mod rate_limit;
mod traits;

pub use adaptive::{AdaptiveConfig, AdaptiveSizer};
pub use bounded::{Mailbox, MailboxOptions};
pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use error::PostError;
pub use metrics::MailboxMetrics;
pub use queue::{FullMode, TurnQueue};
pub use rate_limit::{ExcessAction, RateDecision, RateLimitConfig, RateLimiter};
pub use traits::MessageHandler;
