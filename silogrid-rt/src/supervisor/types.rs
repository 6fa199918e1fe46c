// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// What to do about a failed child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Keep the child as is; the failure was absorbed.
    Resume,

    /// Recreate the child (scope per strategy) after backoff.
    Restart,

    /// Stop and remove the child.
    Stop,

    /// Bubble the failure to the parent supervisor.
    Escalate,
}

/// Which siblings a restart drags along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SupervisionStrategy {
    /// Restart only the failing child.
    #[default]
    OneForOne,

    /// Stop and restart every child.
    AllForOne,

    /// Restart the failing child and every sibling created after it.
    RestForOne,
}

/// Supervision tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisionOptions {
    /// Restart scope selector.
    pub strategy: SupervisionStrategy,

    /// Restarts tolerated within `time_window` before the budget is
    /// exceeded.
    pub max_restarts: u32,

    /// Sliding window for counting restarts.
    pub time_window: Duration,

    /// First backoff delay.
    pub initial_backoff: Duration,

    /// Backoff ceiling.
    pub max_backoff: Duration,

    /// Backoff growth per consecutive restart.
    pub multiplier: f64,

    /// Whether exceeding the budget escalates instead of restarting.
    pub escalate_on_exceeded: bool,
}

impl Default for SupervisionOptions {
    fn default() -> Self {
        Self {
            strategy: SupervisionStrategy::OneForOne,
            max_restarts: 3,
            time_window: Duration::from_secs(60),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
            escalate_on_exceeded: true,
        }
    }
}
