// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// What happens to messages above the rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExcessAction {
    /// Silently discard; `post` reports false.
    #[default]
    Drop,

    /// Fail the post with a rate-limited error.
    Reject,

    /// Let the message through to the mailbox, which applies its own
    /// capacity policy.
    Queue,
}

/// Rate limit tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether the limiter participates in admission at all.
    pub enabled: bool,

    /// Messages admitted per sliding window.
    pub max_messages_per_window: usize,

    /// Window length.
    pub time_window: Duration,

    /// Behavior for excess messages.
    pub excess_action: ExcessAction,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_messages_per_window: 1_000,
            time_window: Duration::from_secs(1),
            excess_action: ExcessAction::Drop,
        }
    }
}

/// Admission decision for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Within the rate; proceed and count it.
    Admit,

    /// Excess under `Drop`: discard silently.
    Drop,

    /// Excess under `Reject`: fail the post.
    Reject,

    /// Excess under `Queue`: proceed without counting.
    Queue,
}

/// Sliding-window rate limiter over message timestamps.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    stamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter for the given tunables.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            stamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Whether the limiter is configured to act.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Decide for one incoming message at the current instant.
    pub fn check(&self) -> RateDecision {
        if !self.config.enabled {
            return RateDecision::Admit;
        }

        let now = Instant::now();
        let mut stamps = self.stamps.lock();
        while let Some(oldest) = stamps.front() {
            if now.duration_since(*oldest) > self.config.time_window {
                stamps.pop_front();
            } else {
                break;
            }
        }

        if stamps.len() < self.config.max_messages_per_window.max(1) {
            stamps.push_back(now);
            return RateDecision::Admit;
        }

        match self.config.excess_action {
            ExcessAction::Drop => RateDecision::Drop,
            ExcessAction::Reject => RateDecision::Reject,
            ExcessAction::Queue => RateDecision::Queue,
        }
    }

    /// Messages counted in the current window.
    pub fn current_window_count(&self) -> usize {
        let now = Instant::now();
        let mut stamps = self.stamps.lock();
        while let Some(oldest) = stamps.front() {
            if now.duration_since(*oldest) > self.config.time_window {
                stamps.pop_front();
            } else {
                break;
            }
        }
        stamps.len()
    }
}
