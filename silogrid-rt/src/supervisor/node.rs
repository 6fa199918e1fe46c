// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

// Layer 3: Internal module imports
use super::backoff::RestartHistory;
use super::error::SupervisorError;
use super::types::{Directive, SupervisionOptions, SupervisionStrategy};
use crate::actor::ActorError;

/// Something a supervisor can start, stop and recreate.
///
/// Activations, pumps and connection holders all fit; the supervisor only
/// needs the lifecycle pair. Failures are reported to the supervisor by
/// whoever observed them via [`Supervisor::on_child_failure`].
#[async_trait]
pub trait SupervisedChild: Send + 'static {
    /// Bring the child up.
    async fn start(&mut self) -> Result<(), ActorError>;

    /// Take the child down, releasing its resources.
    async fn stop(&mut self) -> Result<(), ActorError>;
}

/// Creates a fresh child for (re)starts.
pub type ChildFactory = Box<dyn Fn() -> Box<dyn SupervisedChild> + Send + Sync>;

struct ChildEntry {
    id: String,
    factory: ChildFactory,
    child: Box<dyn SupervisedChild>,
    history: RestartHistory,
}

struct ChildTable {
    /// Creation order; RestForOne depends on it.
    entries: Vec<ChildEntry>,
}

impl ChildTable {
    fn index_of(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }
}

/// A supervisor owning children by id.
///
/// Children are held in creation order; ids are unique within the
/// parent. The decision function maps a failure to a [`Directive`]; the
/// default restarts. Children reference the parent only through the id
/// they report with; there is no back-pointer, so the supervisor table
/// is the single owner of every child.
pub struct Supervisor {
    options: SupervisionOptions,
    decider: Box<dyn Fn(&ActorError) -> Directive + Send + Sync>,
    children: Mutex<ChildTable>,
}

impl Supervisor {
    /// Create a supervisor whose decision function always restarts.
    pub fn new(options: SupervisionOptions) -> Self {
        Self::with_decider(options, |_| Directive::Restart)
    }

    /// Create a supervisor with a custom failure → directive mapping.
    pub fn with_decider(
        options: SupervisionOptions,
        decider: impl Fn(&ActorError) -> Directive + Send + Sync + 'static,
    ) -> Self {
        Self {
            options,
            decider: Box::new(decider),
            children: Mutex::new(ChildTable {
                entries: Vec::new(),
            }),
        }
    }

    /// Create and start a child under a parent-unique id.
    pub async fn spawn_child(
        &self,
        id: impl Into<String>,
        factory: ChildFactory,
    ) -> Result<(), SupervisorError> {
        let id = id.into();
        let mut table = self.children.lock().await;
        if table.index_of(&id).is_some() {
            return Err(SupervisorError::DuplicateChild(id));
        }

        let mut child = (factory)();
        child
            .start()
            .await
            .map_err(|e| SupervisorError::StartFailed {
                id: id.clone(),
                message: e.to_string(),
            })?;

        table.entries.push(ChildEntry {
            id,
            factory,
            child,
            history: RestartHistory::new(&self.options),
        });
        Ok(())
    }

    /// Stop and remove one child.
    pub async fn stop_child(&self, id: &str) -> Result<(), SupervisorError> {
        let mut table = self.children.lock().await;
        let idx = table
            .index_of(id)
            .ok_or_else(|| SupervisorError::UnknownChild(id.to_string()))?;
        let mut entry = table.entries.remove(idx);
        if let Err(err) = entry.child.stop().await {
            warn!(child = %entry.id, error = %err, "child stop failed");
        }
        Ok(())
    }

    /// Stop every child, newest first.
    pub async fn stop_all(&self) {
        let mut table = self.children.lock().await;
        while let Some(mut entry) = table.entries.pop() {
            if let Err(err) = entry.child.stop().await {
                warn!(child = %entry.id, error = %err, "child stop failed");
            }
        }
    }

    /// Child ids in creation order.
    pub async fn child_ids(&self) -> Vec<String> {
        self.children
            .lock()
            .await
            .entries
            .iter()
            .map(|e| e.id.clone())
            .collect()
    }

    /// Number of live children.
    pub async fn child_count(&self) -> usize {
        self.children.lock().await.entries.len()
    }

    /// React to a child failure: decide, enforce the restart budget and
    /// apply the directive within the strategy's scope.
    ///
    /// Returns the directive that was actually applied. `Escalate` (from
    /// the decision function or an exceeded budget) leaves the children
    /// untouched; the caller bubbles the failure to its own parent.
    pub async fn on_child_failure(
        &self,
        id: &str,
        error: &ActorError,
    ) -> Result<Directive, SupervisorError> {
        let mut table = self.children.lock().await;
        let idx = table
            .index_of(id)
            .ok_or_else(|| SupervisorError::UnknownChild(id.to_string()))?;

        let directive = (self.decider)(error);
        match directive {
            Directive::Resume => Ok(Directive::Resume),
            Directive::Escalate => Ok(Directive::Escalate),
            Directive::Stop => {
                let mut entry = table.entries.remove(idx);
                if let Err(err) = entry.child.stop().await {
                    warn!(child = %entry.id, error = %err, "child stop failed");
                }
                Ok(Directive::Stop)
            }
            Directive::Restart => {
                if self.options.escalate_on_exceeded
                    && table.entries[idx].history.would_exceed(self.options.max_restarts)
                {
                    warn!(child = %id, max_restarts = self.options.max_restarts,
                          "restart budget exceeded, escalating");
                    return Ok(Directive::Escalate);
                }

                let delay = table.entries[idx].history.record_restart();
                info!(child = %id, delay_ms = delay.as_millis() as u64, error = %error,
                      "restarting child");
                tokio::time::sleep(delay).await;

                let scope: Vec<usize> = match self.options.strategy {
                    SupervisionStrategy::OneForOne => vec![idx],
                    SupervisionStrategy::AllForOne => (0..table.entries.len()).collect(),
                    SupervisionStrategy::RestForOne => (idx..table.entries.len()).collect(),
                };

                // Stop newest-first, restart in creation order.
                for &i in scope.iter().rev() {
                    if let Err(err) = table.entries[i].child.stop().await {
                        warn!(child = %table.entries[i].id, error = %err, "child stop failed");
                    }
                }
                for &i in &scope {
                    let fresh = (table.entries[i].factory)();
                    table.entries[i].child = fresh;
                    table.entries[i].child.start().await.map_err(|e| {
                        SupervisorError::StartFailed {
                            id: table.entries[i].id.clone(),
                            message: e.to_string(),
                        }
                    })?;
                }
                Ok(Directive::Restart)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    struct ProbeChild {
        starts: Arc<AtomicU32>,
        stops: Arc<AtomicU32>,
    }

    #[async_trait]
    impl SupervisedChild for ProbeChild {
        async fn start(&mut self) -> Result<(), ActorError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&mut self) -> Result<(), ActorError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn probe_factory(starts: Arc<AtomicU32>, stops: Arc<AtomicU32>) -> ChildFactory {
        Box::new(move || {
            Box::new(ProbeChild {
                starts: Arc::clone(&starts),
                stops: Arc::clone(&stops),
            }) as Box<dyn SupervisedChild>
        })
    }

    fn fast_options(strategy: SupervisionStrategy) -> SupervisionOptions {
        SupervisionOptions {
            strategy,
            max_restarts: 3,
            time_window: Duration::from_secs(10),
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            multiplier: 2.0,
            escalate_on_exceeded: true,
        }
    }

    struct Counters {
        starts: Arc<AtomicU32>,
        stops: Arc<AtomicU32>,
    }

    impl Counters {
        fn new() -> Self {
            Self {
                starts: Arc::new(AtomicU32::new(0)),
                stops: Arc::new(AtomicU32::new(0)),
            }
        }

        fn factory(&self) -> ChildFactory {
            probe_factory(Arc::clone(&self.starts), Arc::clone(&self.stops))
        }

        fn starts(&self) -> u32 {
            self.starts.load(Ordering::SeqCst)
        }

        fn stops(&self) -> u32 {
            self.stops.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_spawn_starts_child_once() {
        let sup = Supervisor::new(fast_options(SupervisionStrategy::OneForOne));
        let c = Counters::new();

        sup.spawn_child("worker", c.factory()).await.unwrap();

        assert_eq!(c.starts(), 1);
        assert_eq!(sup.child_ids().await, vec!["worker"]);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let sup = Supervisor::new(fast_options(SupervisionStrategy::OneForOne));
        let c = Counters::new();

        sup.spawn_child("worker", c.factory()).await.unwrap();
        let err = sup.spawn_child("worker", c.factory()).await.unwrap_err();

        assert_eq!(err, SupervisorError::DuplicateChild("worker".to_string()));
        assert_eq!(sup.child_count().await, 1);
    }

    #[tokio::test]
    async fn test_one_for_one_restarts_only_failing_child() {
        let sup = Supervisor::new(fast_options(SupervisionStrategy::OneForOne));
        let a = Counters::new();
        let b = Counters::new();
        sup.spawn_child("a", a.factory()).await.unwrap();
        sup.spawn_child("b", b.factory()).await.unwrap();

        let directive = sup
            .on_child_failure("a", &ActorError::failure("boom"))
            .await
            .unwrap();

        assert_eq!(directive, Directive::Restart);
        assert_eq!(a.starts(), 2);
        assert_eq!(a.stops(), 1);
        assert_eq!(b.starts(), 1);
        assert_eq!(b.stops(), 0);
    }

    #[tokio::test]
    async fn test_all_for_one_restarts_everyone() {
        let sup = Supervisor::new(fast_options(SupervisionStrategy::AllForOne));
        let a = Counters::new();
        let b = Counters::new();
        sup.spawn_child("a", a.factory()).await.unwrap();
        sup.spawn_child("b", b.factory()).await.unwrap();

        sup.on_child_failure("b", &ActorError::failure("boom"))
            .await
            .unwrap();

        assert_eq!(a.starts(), 2);
        assert_eq!(b.starts(), 2);
        assert_eq!(a.stops(), 1);
        assert_eq!(b.stops(), 1);
    }

    #[tokio::test]
    async fn test_rest_for_one_restarts_failing_and_later_siblings() {
        let sup = Supervisor::new(fast_options(SupervisionStrategy::RestForOne));
        let a = Counters::new();
        let b = Counters::new();
        let c = Counters::new();
        sup.spawn_child("a", a.factory()).await.unwrap();
        sup.spawn_child("b", b.factory()).await.unwrap();
        sup.spawn_child("c", c.factory()).await.unwrap();

        sup.on_child_failure("b", &ActorError::failure("boom"))
            .await
            .unwrap();

        assert_eq!(a.starts(), 1, "earlier sibling untouched");
        assert_eq!(b.starts(), 2);
        assert_eq!(c.starts(), 2);
    }

    #[tokio::test]
    async fn test_escalates_after_budget() {
        let sup = Supervisor::new(fast_options(SupervisionStrategy::OneForOne));
        let c = Counters::new();
        sup.spawn_child("a", c.factory()).await.unwrap();

        for _ in 0..3 {
            assert_eq!(
                sup.on_child_failure("a", &ActorError::failure("boom"))
                    .await
                    .unwrap(),
                Directive::Restart
            );
        }
        // Fourth failure inside the window: budget exceeded.
        assert_eq!(
            sup.on_child_failure("a", &ActorError::failure("boom"))
                .await
                .unwrap(),
            Directive::Escalate
        );
        // No fourth restart happened.
        assert_eq!(c.starts(), 4); // 1 spawn + 3 restarts
    }

    #[tokio::test]
    async fn test_backoff_delays_grow() {
        let mut options = fast_options(SupervisionStrategy::OneForOne);
        options.initial_backoff = Duration::from_millis(20);
        options.max_backoff = Duration::from_millis(200);
        let sup = Supervisor::new(options);
        let c = Counters::new();
        sup.spawn_child("a", c.factory()).await.unwrap();

        let t0 = Instant::now();
        sup.on_child_failure("a", &ActorError::failure("boom"))
            .await
            .unwrap();
        let first = t0.elapsed();

        let t1 = Instant::now();
        sup.on_child_failure("a", &ActorError::failure("boom"))
            .await
            .unwrap();
        let second = t1.elapsed();

        assert!(first >= Duration::from_millis(20));
        assert!(second >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_custom_decider_resume_and_stop() {
        let sup = Supervisor::with_decider(
            fast_options(SupervisionStrategy::OneForOne),
            |error| match error {
                ActorError::Failure(msg) if msg == "transient" => Directive::Resume,
                _ => Directive::Stop,
            },
        );
        let c = Counters::new();
        sup.spawn_child("a", c.factory()).await.unwrap();

        assert_eq!(
            sup.on_child_failure("a", &ActorError::failure("transient"))
                .await
                .unwrap(),
            Directive::Resume
        );
        assert_eq!(sup.child_count().await, 1);

        assert_eq!(
            sup.on_child_failure("a", &ActorError::failure("fatal"))
                .await
                .unwrap(),
            Directive::Stop
        );
        assert_eq!(sup.child_count().await, 0);
        assert_eq!(c.stops(), 1);
    }

    #[tokio::test]
    async fn test_unknown_child_errors() {
        let sup = Supervisor::new(fast_options(SupervisionStrategy::OneForOne));
        let err = sup
            .on_child_failure("ghost", &ActorError::failure("boom"))
            .await
            .unwrap_err();
        assert_eq!(err, SupervisorError::UnknownChild("ghost".to_string()));
    }

    #[tokio::test]
    async fn test_stop_all_reverse_order() {
        let sup = Supervisor::new(fast_options(SupervisionStrategy::OneForOne));
        let a = Counters::new();
        let b = Counters::new();
        sup.spawn_child("a", a.factory()).await.unwrap();
        sup.spawn_child("b", b.factory()).await.unwrap();

        sup.stop_all().await;

        assert_eq!(sup.child_count().await, 0);
        assert_eq!(a.stops(), 1);
        assert_eq!(b.stops(), 1);
    }
}
