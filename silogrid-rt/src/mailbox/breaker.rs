// Layer 1: Standard library imports
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

// Layer 3: Internal module imports
// (none)

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation; failures are being counted.
    Closed,

    /// Failing fast; posts are rejected until the timeout elapses.
    Open,

    /// Probing: traffic flows, successes close the circuit, any failure
    /// reopens it.
    HalfOpen,
}

/// Circuit breaker tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Whether the breaker participates in admission at all.
    pub enabled: bool,

    /// Consecutive failures within the sampling window that open the circuit.
    pub failure_threshold: u32,

    /// Consecutive successes in `HalfOpen` that close the circuit.
    pub success_threshold: u32,

    /// How long the circuit stays open before probing.
    pub timeout: Duration,

    /// Failures older than this stop counting as consecutive.
    pub sampling_window: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            failure_threshold: 5,
            success_threshold: 3,
            timeout: Duration::from_secs(30),
            sampling_window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    run_started_at: Option<Instant>,
    opened_at: Option<Instant>,
}

/// Per-mailbox circuit breaker.
///
/// Transitions:
/// - `Closed → Open` once `failure_threshold` consecutive failures land
///   within `sampling_window`;
/// - `Open → HalfOpen` after `timeout` from the moment it opened;
/// - `HalfOpen → Closed` after `success_threshold` consecutive successes;
/// - `HalfOpen → Open` on any failure.
///
/// Counters reset on every state transition.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a breaker in the `Closed` state.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                run_started_at: None,
                opened_at: None,
            }),
        }
    }

    /// Whether the breaker is configured to act.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Admission check. When `Open`, flips to `HalfOpen` once the timeout
    /// elapsed and admits the probe; otherwise rejects.
    pub fn allow(&self) -> bool {
        if !self.config.enabled {
            return true;
        }
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.config.timeout {
                    debug!("circuit half-open");
                    inner.state = CircuitState::HalfOpen;
                    inner.consecutive_failures = 0;
                    inner.consecutive_successes = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful turn.
    pub fn on_success(&self) {
        if !self.config.enabled {
            return;
        }
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
                inner.run_started_at = None;
            }
            CircuitState::HalfOpen => {
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.config.success_threshold {
                    debug!("circuit closed");
                    inner.state = CircuitState::Closed;
                    inner.consecutive_failures = 0;
                    inner.consecutive_successes = 0;
                    inner.run_started_at = None;
                    inner.opened_at = None;
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed turn.
    pub fn on_failure(&self) {
        if !self.config.enabled {
            return;
        }
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => {
                // A stale run restarts the consecutive count.
                let stale = inner
                    .run_started_at
                    .map(|at| at.elapsed() > self.config.sampling_window)
                    .unwrap_or(false);
                if stale || inner.run_started_at.is_none() {
                    inner.run_started_at = Some(Instant::now());
                    inner.consecutive_failures = 0;
                }
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    debug!("circuit open");
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    inner.consecutive_failures = 0;
                    inner.consecutive_successes = 0;
                    inner.run_started_at = None;
                }
            }
            CircuitState::HalfOpen => {
                debug!("circuit reopened");
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.consecutive_failures = 0;
                inner.consecutive_successes = 0;
            }
            CircuitState::Open => {}
        }
    }

    /// Current state (reported as-is; `Open → HalfOpen` happens on `allow`).
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }
}
