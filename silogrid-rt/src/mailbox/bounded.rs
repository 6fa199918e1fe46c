// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{trace, warn};

// Layer 3: Internal module imports
use super::adaptive::{AdaptiveConfig, AdaptiveSizer};
use super::breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use super::error::PostError;
use super::metrics::MailboxMetrics;
use super::queue::{FullMode, TurnQueue};
use super::rate_limit::{RateDecision, RateLimitConfig, RateLimiter};
use super::traits::MessageHandler;
use crate::dlq::RetryPolicy;
use crate::message::Envelope;

/// Everything a mailbox can be tuned with.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MailboxOptions {
    /// Queue capacity when adaptive sizing is off.
    pub capacity: Option<usize>,

    /// Full-queue policy.
    pub full_mode: FullMode,

    /// Adaptive capacity behavior.
    pub adaptive: AdaptiveConfig,

    /// Circuit breaker behavior.
    pub breaker: CircuitBreakerConfig,

    /// Rate limiting behavior.
    pub rate_limit: RateLimitConfig,

    /// Retry schedule for failed turns.
    pub retry: RetryPolicy,
}

impl MailboxOptions {
    fn initial_capacity(&self) -> usize {
        if self.adaptive.enabled {
            self.adaptive.initial_capacity
        } else {
            self.capacity.unwrap_or(1_000)
        }
    }
}

/// Per-activation mailbox with a dedicated single-consumer turn loop.
///
/// `post` runs the admission chain (circuit breaker, rate limiter, queue
/// policy, adaptive sampling); the consumer loop started by
/// [`Mailbox::start`] dequeues one envelope at a time and fully awaits
/// the handler before the next dequeue, which is the turn-based
/// invariant. A failing turn is retried inline per the retry policy and
/// handed to the handler's dead-letter hook on exhaustion; the consumer
/// itself never exits on message failure, only [`Mailbox::stop`] drains
/// and terminates it.
pub struct Mailbox {
    queue: Arc<TurnQueue>,
    breaker: Arc<CircuitBreaker>,
    limiter: RateLimiter,
    sizer: AdaptiveSizer,
    retry: RetryPolicy,
    metrics: Arc<MailboxMetrics>,
    processing: Arc<AtomicBool>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl Mailbox {
    /// Create a mailbox; the consumer loop starts on [`Mailbox::start`].
    pub fn new(options: MailboxOptions) -> Self {
        let metrics = Arc::new(MailboxMetrics::new());
        let queue = Arc::new(TurnQueue::new(
            options.initial_capacity(),
            options.full_mode,
            Arc::clone(&metrics),
        ));
        Self {
            queue,
            breaker: Arc::new(CircuitBreaker::new(options.breaker)),
            limiter: RateLimiter::new(options.rate_limit),
            sizer: AdaptiveSizer::new(options.adaptive),
            retry: options.retry,
            metrics,
            processing: Arc::new(AtomicBool::new(false)),
            consumer: Mutex::new(None),
        }
    }

    /// Offer an envelope to the activation.
    pub async fn post(&self, envelope: Envelope) -> Result<(), PostError> {
        if !self.breaker.allow() {
            return Err(PostError::CircuitOpen);
        }

        match self.limiter.check() {
            RateDecision::Admit | RateDecision::Queue => {}
            RateDecision::Drop => {
                self.metrics.record_dropped();
                return Err(PostError::Dropped);
            }
            RateDecision::Reject => return Err(PostError::RateLimited),
        }

        self.queue.push(envelope).await?;

        if let Some(new_capacity) = self.sizer.observe(self.queue.len(), self.queue.capacity()) {
            trace!(capacity = new_capacity, "mailbox resized");
            self.queue.set_capacity(new_capacity);
        }
        Ok(())
    }

    /// Spawn the dedicated consumer loop feeding the handler.
    pub fn start(&self, handler: Arc<dyn MessageHandler>) {
        let queue = Arc::clone(&self.queue);
        let breaker = Arc::clone(&self.breaker);
        let metrics = Arc::clone(&self.metrics);
        let processing = Arc::clone(&self.processing);
        let retry = self.retry.clone();

        let handle = tokio::spawn(async move {
            while let Some(envelope) = queue.recv().await {
                processing.store(true, Ordering::Release);
                Self::run_turn(&*handler, &envelope, &retry, &breaker, &metrics).await;
                metrics.record_dequeued();
                processing.store(false, Ordering::Release);
            }
        });

        *self.consumer.lock() = Some(handle);
    }

    async fn run_turn(
        handler: &dyn MessageHandler,
        envelope: &Envelope,
        retry: &RetryPolicy,
        breaker: &CircuitBreaker,
        metrics: &MailboxMetrics,
    ) {
        let mut attempt: u32 = 1;
        loop {
            match handler.handle(envelope).await {
                Ok(()) => {
                    breaker.on_success();
                    return;
                }
                Err(error) => {
                    breaker.on_failure();
                    metrics.record_failed_turn();
                    if retry.enabled && attempt <= retry.max_retries {
                        let delay = retry.delay_for_attempt(attempt);
                        warn!(method = %envelope.method_name, attempt, delay_ms = delay.as_millis() as u64,
                              error = %error, "turn failed, retrying");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    metrics.record_dead_lettered();
                    handler.on_dead_letter(envelope, &error, attempt - 1).await;
                    return;
                }
            }
        }
    }

    /// Close the queue, drain what is already enqueued and join the
    /// consumer.
    pub async fn stop(&self) {
        self.queue.close();
        let handle = self.consumer.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Messages currently queued.
    pub fn message_count(&self) -> usize {
        self.queue.len()
    }

    /// Whether a turn is currently in flight.
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Current queue capacity.
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Current breaker state.
    pub fn breaker_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Mailbox counters.
    pub fn metrics(&self) -> &MailboxMetrics {
        &self.metrics
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::actor::ActorError;
    use crate::mailbox::ExcessAction;
    use async_trait::async_trait;
    use bytes::Bytes;
    use parking_lot::Mutex as PlMutex;
    use std::time::{Duration, Instant};

    struct RecordingHandler {
        delay: Duration,
        fail_methods: Vec<String>,
        invocations: PlMutex<Vec<(String, Instant)>>,
        dead_letters: PlMutex<Vec<(String, u32)>>,
        active: AtomicBool,
        overlap_seen: AtomicBool,
    }

    impl RecordingHandler {
        fn new(delay: Duration, fail_methods: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                delay,
                fail_methods: fail_methods.iter().map(|s| s.to_string()).collect(),
                invocations: PlMutex::new(Vec::new()),
                dead_letters: PlMutex::new(Vec::new()),
                active: AtomicBool::new(false),
                overlap_seen: AtomicBool::new(false),
            })
        }

        fn invocation_count(&self) -> usize {
            self.invocations.lock().len()
        }
    }

    #[async_trait]
    impl MessageHandler for RecordingHandler {
        async fn handle(&self, envelope: &Envelope) -> Result<(), ActorError> {
            if self.active.swap(true, Ordering::SeqCst) {
                self.overlap_seen.store(true, Ordering::SeqCst);
            }
            self.invocations
                .lock()
                .push((envelope.method_name.clone(), Instant::now()));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.active.store(false, Ordering::SeqCst);
            if self.fail_methods.contains(&envelope.method_name) {
                Err(ActorError::Failure("bad".to_string()))
            } else {
                Ok(())
            }
        }

        async fn on_dead_letter(&self, envelope: &Envelope, _error: &ActorError, retries: u32) {
            self.dead_letters
                .lock()
                .push((envelope.method_name.clone(), retries));
        }
    }

    fn envelope(method: &str) -> Envelope {
        Envelope::request("T", "a1", method, Bytes::new())
    }

    fn options() -> MailboxOptions {
        MailboxOptions {
            retry: RetryPolicy::disabled(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_turns_do_not_overlap() {
        let handler = RecordingHandler::new(Duration::from_millis(2), &[]);
        let mailbox = Arc::new(Mailbox::new(options()));
        mailbox.start(Arc::clone(&handler) as Arc<dyn MessageHandler>);

        let mut producers = Vec::new();
        for _ in 0..4 {
            let mailbox = Arc::clone(&mailbox);
            producers.push(tokio::spawn(async move {
                for _ in 0..5 {
                    mailbox.post(envelope("Work")).await.unwrap();
                }
            }));
        }
        for p in producers {
            p.await.unwrap();
        }
        mailbox.stop().await;

        assert_eq!(handler.invocation_count(), 20);
        assert!(!handler.overlap_seen.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_retry_then_dead_letter_with_spacing() {
        let handler = RecordingHandler::new(Duration::ZERO, &["Boom"]);
        let mut opts = options();
        opts.retry = RetryPolicy {
            enabled: true,
            max_retries: 2,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(10),
            multiplier: 1.0,
            jitter: false,
        };
        let mailbox = Mailbox::new(opts);
        mailbox.start(Arc::clone(&handler) as Arc<dyn MessageHandler>);

        mailbox.post(envelope("Boom")).await.unwrap();
        mailbox.stop().await;

        // 1 initial + 2 retries.
        let invocations = handler.invocations.lock();
        assert_eq!(invocations.len(), 3);
        let gap1 = invocations[1].1 - invocations[0].1;
        let gap2 = invocations[2].1 - invocations[1].1;
        assert!(gap1 >= Duration::from_millis(9), "{gap1:?}");
        assert!(gap2 >= Duration::from_millis(9), "{gap2:?}");
        drop(invocations);

        assert_eq!(handler.dead_letters.lock().as_slice(), &[("Boom".to_string(), 2)]);
        assert_eq!(mailbox.metrics().dead_lettered(), 1);
    }

    #[tokio::test]
    async fn test_consumer_survives_failures() {
        let handler = RecordingHandler::new(Duration::ZERO, &["Boom"]);
        let mailbox = Mailbox::new(options());
        mailbox.start(Arc::clone(&handler) as Arc<dyn MessageHandler>);

        mailbox.post(envelope("Boom")).await.unwrap();
        mailbox.post(envelope("Work")).await.unwrap();
        mailbox.stop().await;

        assert_eq!(handler.invocation_count(), 2);
        assert_eq!(handler.dead_letters.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_breaker_opens_and_recovers() {
        let handler = RecordingHandler::new(Duration::ZERO, &["Boom"]);
        let mut opts = options();
        opts.breaker = CircuitBreakerConfig {
            enabled: true,
            failure_threshold: 3,
            success_threshold: 2,
            timeout: Duration::from_millis(50),
            sampling_window: Duration::from_secs(10),
        };
        let mailbox = Mailbox::new(opts);
        mailbox.start(Arc::clone(&handler) as Arc<dyn MessageHandler>);

        for _ in 0..3 {
            mailbox.post(envelope("Boom")).await.unwrap();
        }
        // Let the consumer chew through the failures.
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(mailbox.breaker_state(), CircuitState::Open);
        assert_eq!(mailbox.post(envelope("Work")).await, Err(PostError::CircuitOpen));

        tokio::time::sleep(Duration::from_millis(60)).await;
        // Timeout elapsed: the next posts probe the half-open circuit.
        mailbox.post(envelope("Work")).await.unwrap();
        mailbox.post(envelope("Work")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(mailbox.breaker_state(), CircuitState::Closed);

        mailbox.stop().await;
    }

    #[tokio::test]
    async fn test_rate_limit_reject() {
        let handler = RecordingHandler::new(Duration::ZERO, &[]);
        let mut opts = options();
        opts.rate_limit = RateLimitConfig {
            enabled: true,
            max_messages_per_window: 2,
            time_window: Duration::from_secs(10),
            excess_action: ExcessAction::Reject,
        };
        let mailbox = Mailbox::new(opts);
        mailbox.start(Arc::clone(&handler) as Arc<dyn MessageHandler>);

        mailbox.post(envelope("Work")).await.unwrap();
        mailbox.post(envelope("Work")).await.unwrap();
        assert_eq!(mailbox.post(envelope("Work")).await, Err(PostError::RateLimited));

        mailbox.stop().await;
    }

    #[tokio::test]
    async fn test_rate_limit_drop_is_silent() {
        let handler = RecordingHandler::new(Duration::ZERO, &[]);
        let mut opts = options();
        opts.rate_limit = RateLimitConfig {
            enabled: true,
            max_messages_per_window: 1,
            time_window: Duration::from_secs(10),
            excess_action: ExcessAction::Drop,
        };
        let mailbox = Mailbox::new(opts);
        mailbox.start(Arc::clone(&handler) as Arc<dyn MessageHandler>);

        mailbox.post(envelope("Work")).await.unwrap();
        assert_eq!(mailbox.post(envelope("Work")).await, Err(PostError::Dropped));
        assert_eq!(mailbox.metrics().dropped(), 1);

        mailbox.stop().await;
    }

    #[tokio::test]
    async fn test_stop_drains_backlog() {
        let handler = RecordingHandler::new(Duration::from_millis(1), &[]);
        let mailbox = Mailbox::new(options());
        mailbox.start(Arc::clone(&handler) as Arc<dyn MessageHandler>);

        for _ in 0..10 {
            mailbox.post(envelope("Work")).await.unwrap();
        }
        mailbox.stop().await;

        assert_eq!(handler.invocation_count(), 10);
        assert_eq!(mailbox.message_count(), 0);
        // Stopped mailbox refuses new posts.
        assert_eq!(mailbox.post(envelope("Work")).await, Err(PostError::Closed));
    }

    #[tokio::test]
    async fn test_adaptive_growth_under_pressure() {
        let handler = RecordingHandler::new(Duration::from_millis(50), &[]);
        let mut opts = options();
        opts.adaptive = AdaptiveConfig {
            enabled: true,
            initial_capacity: 4,
            min_capacity: 2,
            max_capacity: 64,
            grow_threshold: 0.5,
            shrink_threshold: 0.0,
            growth_factor: 2.0,
            shrink_factor: 0.5,
            min_samples: 2,
        };
        let mailbox = Mailbox::new(opts);
        assert_eq!(mailbox.capacity(), 4);
        mailbox.start(Arc::clone(&handler) as Arc<dyn MessageHandler>);

        // Slow consumer: the queue fills and the sizer reacts.
        for _ in 0..4 {
            mailbox.post(envelope("Work")).await.unwrap();
        }
        assert!(mailbox.capacity() >= 8, "capacity {}", mailbox.capacity());

        mailbox.stop().await;
    }
}
