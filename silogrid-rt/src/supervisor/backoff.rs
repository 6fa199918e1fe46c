//! Restart rate limiting and exponential backoff.
//!
//! Tracks restart timestamps in a sliding window to enforce the restart
//! budget, and a consecutive-run counter that drives the backoff
//! sequence. The two decouple deliberately: the window answers "has this
//! child restarted too often lately", the consecutive count answers "how
//! hard should we brake right now".

// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::time::Duration;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};

// Layer 3: Internal module imports
use super::types::SupervisionOptions;

/// Per-child restart history.
///
/// # Backoff sequence
///
/// Restart `n` of a consecutive run waits
/// `initial_backoff * multiplier^(n-1)`, clamped to `max_backoff`. The
/// run resets once the child stays up longer than the sliding window, so
/// a child that failed hard an hour ago starts over at the initial delay.
#[derive(Debug, Clone)]
pub struct RestartHistory {
    time_window: Duration,
    initial_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
    /// Restart timestamps, newest first.
    restarts: VecDeque<DateTime<Utc>>,
    consecutive: u32,
}

impl RestartHistory {
    /// Create a history from supervision options.
    pub fn new(options: &SupervisionOptions) -> Self {
        Self {
            time_window: options.time_window,
            initial_backoff: options.initial_backoff,
            max_backoff: options.max_backoff,
            multiplier: options.multiplier,
            restarts: VecDeque::new(),
            consecutive: 0,
        }
    }

    fn prune(&mut self) {
        let Ok(window) = chrono::Duration::from_std(self.time_window) else {
            return;
        };
        let cutoff = Utc::now() - window;
        while let Some(&oldest) = self.restarts.back() {
            if oldest < cutoff {
                self.restarts.pop_back();
            } else {
                break;
            }
        }
        if self.restarts.is_empty() {
            self.consecutive = 0;
        }
    }

    /// Restarts still inside the sliding window.
    pub fn restarts_in_window(&mut self) -> u32 {
        self.prune();
        self.restarts.len() as u32
    }

    /// Whether one more restart would blow the budget.
    pub fn would_exceed(&mut self, max_restarts: u32) -> bool {
        self.restarts_in_window() >= max_restarts
    }

    /// Record a restart and return the delay to apply before it.
    pub fn record_restart(&mut self) -> Duration {
        self.prune();
        self.consecutive += 1;
        self.restarts.push_front(Utc::now());

        let exponent = self.consecutive.saturating_sub(1).min(32);
        let factor = self.multiplier.max(1.0).powi(exponent as i32);
        let delay_ms = self.initial_backoff.as_millis() as f64 * factor;
        let capped = delay_ms.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Length of the current consecutive run.
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// Forget everything (manual intervention, successful stabilization).
    pub fn reset(&mut self) {
        self.restarts.clear();
        self.consecutive = 0;
    }
}
