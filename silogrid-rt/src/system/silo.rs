//! The silo: routing, activation ownership and lifecycle.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::{Mutex as PlMutex, RwLock as PlRwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// Layer 3: Internal module imports
use super::config::SiloConfig;
use super::errors::SiloError;
use super::query::{run_query, ActorInfo, ActorPage, ActorQuery};
use crate::actor::{Activation, ActorFactoryRegistry};
use crate::dispatch::DispatcherRegistry;
use crate::dlq::DeadLetterQueue;
use crate::mailbox::MailboxOptions;
use crate::membership::MembershipRegistry;
use crate::message::{CallError, Envelope};
use crate::placement::{PlacementCache, PlacementPolicy};
use crate::transport::{EnvelopeReceiver, Transport};
use crate::util::{ActorKey, SiloId};

/// Context metadata key carrying the eager-state-loading hint.
pub(crate) const EAGER_STATE_LOADING_KEY: &str = "eager_state_loading";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SiloState {
    Running,
    ShuttingDown,
    Stopped,
}

struct SiloInner {
    config: SiloConfig,
    membership: Arc<MembershipRegistry>,
    placement: Arc<dyn PlacementPolicy>,
    placement_cache: PlacementCache,
    transport: Arc<dyn Transport>,
    factories: Arc<ActorFactoryRegistry>,
    dispatchers: Arc<DispatcherRegistry>,
    dlq: Arc<DeadLetterQueue>,
    activations: DashMap<ActorKey, Arc<Activation>>,
    // Serializes activation creation so an identity activates once.
    creation_lock: tokio::sync::Mutex<()>,
    state: PlRwLock<SiloState>,
    tasks: PlMutex<Vec<JoinHandle<()>>>,
    cancel: CancellationToken,
}

/// A process hosting actor activations.
///
/// Composes membership, placement, transport and the registries. The
/// silo is `Clone` over a shared inner; it implements
/// [`EnvelopeReceiver`] so both local short-circuit sends and inbound
/// remote envelopes flow through the same resolve → mailbox → respond
/// path.
#[derive(Clone)]
pub struct Silo {
    inner: Arc<SiloInner>,
}

impl Silo {
    /// Compose a silo out of its collaborators.
    pub fn new(
        config: SiloConfig,
        membership: Arc<MembershipRegistry>,
        placement: Arc<dyn PlacementPolicy>,
        transport: Arc<dyn Transport>,
        factories: Arc<ActorFactoryRegistry>,
        dispatchers: Arc<DispatcherRegistry>,
    ) -> Self {
        let dlq = Arc::new(DeadLetterQueue::new(config.dlq.clone()));
        Self {
            inner: Arc::new(SiloInner {
                config,
                membership,
                placement,
                placement_cache: PlacementCache::new(),
                transport,
                factories,
                dispatchers,
                dlq,
                activations: DashMap::new(),
                creation_lock: tokio::sync::Mutex::new(()),
                state: PlRwLock::new(SiloState::Running),
                tasks: PlMutex::new(Vec::new()),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Validate configuration, wire the receiver hook, start the
    /// transport and background sweeps.
    pub async fn start(&self) -> Result<(), SiloError> {
        self.inner.config.validate()?;
        self.inner
            .transport
            .set_receiver(Arc::new(self.clone()) as Arc<dyn EnvelopeReceiver>);
        self.inner.transport.start().await?;

        if self.inner.config.serverless.enabled {
            self.spawn_idle_sweeper();
        }
        info!(silo = %self.inner.config.silo_id, "silo started");
        Ok(())
    }

    /// This silo's member id.
    pub fn silo_id(&self) -> &SiloId {
        &self.inner.config.silo_id
    }

    /// The membership registry backing placement.
    pub fn membership(&self) -> &Arc<MembershipRegistry> {
        &self.inner.membership
    }

    /// The dead-letter queue (inspection and replay).
    pub fn dead_letters(&self) -> &Arc<DeadLetterQueue> {
        &self.inner.dlq
    }

    fn is_running(&self) -> bool {
        *self.inner.state.read() == SiloState::Running
    }

    /// Route and invoke an actor method anywhere in the cluster.
    ///
    /// The target silo comes from the placement cache or policy; local
    /// targets short-circuit inside the transport. The returned bytes
    /// are the method's framed result.
    pub async fn call(
        &self,
        actor_type: &str,
        actor_id: &str,
        method: &str,
        payload: Bytes,
    ) -> Result<Bytes, CallError> {
        if !self.is_running() {
            return Err(CallError::ActorFailure("silo shutting down".to_string()));
        }
        let target = self.select_target(actor_type, actor_id).ok_or_else(|| {
            CallError::ActorFailure(format!("no active silo to place {actor_type}/{actor_id}"))
        })?;

        let envelope = Envelope::request(actor_type, actor_id, method, payload);
        let response = self
            .inner
            .transport
            .send(&target, envelope)
            .await
            .map_err(|e| e.as_call_error())?;

        match response.error() {
            Some(error) => Err(error),
            None => Ok(response.response_payload.unwrap_or_default()),
        }
    }

    fn select_target(&self, actor_type: &str, actor_id: &str) -> Option<SiloId> {
        let version = self.inner.membership.version();
        if let Some(cached) = self
            .inner
            .placement_cache
            .get(actor_type, actor_id, version)
        {
            return Some(cached);
        }

        let available = self.inner.membership.active_silo_ids();
        let target = self
            .inner
            .placement
            .select_silo(actor_type, actor_id, &available)?;
        self.inner
            .placement_cache
            .insert(actor_type, actor_id, version, target.clone());
        Some(target)
    }

    async fn resolve_activation(&self, key: &ActorKey) -> Result<Arc<Activation>, CallError> {
        if let Some(activation) = self.inner.activations.get(key) {
            return Ok(Arc::clone(&activation));
        }

        let _guard = self.inner.creation_lock.lock().await;
        if let Some(activation) = self.inner.activations.get(key) {
            return Ok(Arc::clone(&activation));
        }

        let dispatcher = self
            .inner
            .dispatchers
            .get(&key.actor_type)
            .ok_or_else(|| CallError::UnknownActorType(key.actor_type.clone()))?;
        let instance = self
            .inner
            .factories
            .create(&key.actor_type, &key.actor_id)
            .ok_or_else(|| CallError::UnknownActorType(key.actor_type.clone()))?;

        // The type's dead-letter override carries its retry policy.
        let mut mailbox_options: MailboxOptions = self.inner.config.mailbox.clone();
        mailbox_options.retry = self.inner.dlq.options_for(&key.actor_type).retry;

        let mut seed_metadata = HashMap::new();
        if self.inner.config.serverless.eager_state_loading {
            seed_metadata.insert(EAGER_STATE_LOADING_KEY.to_string(), "true".to_string());
        }

        let activation = Activation::spawn(
            key.clone(),
            instance,
            dispatcher,
            mailbox_options,
            Arc::clone(&self.inner.dlq),
            seed_metadata,
        )
        .await
        .map_err(|e| CallError::ActorFailure(e.to_string()))?;

        self.inner
            .activations
            .insert(key.clone(), Arc::clone(&activation));
        Ok(activation)
    }

    /// Explicitly deactivate one identity. Returns whether it was live.
    pub async fn deactivate(&self, key: &ActorKey) -> bool {
        match self.inner.activations.remove(key) {
            Some((_, activation)) => {
                activation.deactivate().await;
                true
            }
            None => false,
        }
    }

    /// Live activation count.
    pub fn activation_count(&self) -> usize {
        self.inner.activations.len()
    }

    /// Whether an identity is currently activated here.
    pub fn is_active(&self, key: &ActorKey) -> bool {
        self.inner.activations.contains_key(key)
    }

    fn snapshot_infos(&self) -> Vec<ActorInfo> {
        self.inner
            .activations
            .iter()
            .map(|entry| {
                let activation = entry.value();
                ActorInfo {
                    actor_type: activation.key().actor_type.clone(),
                    actor_id: activation.key().actor_id.clone(),
                    activated_at: activation.activated_at(),
                    last_activity: activation.last_activity(),
                    queued_messages: activation.mailbox().message_count(),
                    is_processing: activation.mailbox().is_processing(),
                }
            })
            .collect()
    }

    /// Paginated activation listing with type/id filters.
    pub fn query_actors(&self, query: &ActorQuery) -> Result<ActorPage, SiloError> {
        run_query(self.snapshot_infos(), query)
    }

    /// Activation counts aggregated by actor type.
    pub fn count_by_type(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for entry in self.inner.activations.iter() {
            *counts
                .entry(entry.key().actor_type.clone())
                .or_insert(0usize) += 1;
        }
        counts
    }

    fn spawn_idle_sweeper(&self) {
        let silo = self.clone();
        let serverless = self.inner.config.serverless.clone();
        let cancel = self.inner.cancel.child_token();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(serverless.check_interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let Ok(idle_window) = chrono::Duration::from_std(serverless.idle_timeout) else {
                    continue;
                };
                let cutoff = Utc::now() - idle_window;

                let mut idle: Vec<(ActorKey, chrono::DateTime<Utc>)> = silo
                    .inner
                    .activations
                    .iter()
                    .filter(|entry| {
                        let a = entry.value();
                        a.last_activity() < cutoff
                            && !a.mailbox().is_processing()
                            && a.mailbox().message_count() == 0
                    })
                    .map(|entry| (entry.key().clone(), entry.value().last_activity()))
                    .collect();
                idle.sort_by_key(|(_, last)| *last);

                let total = silo.activation_count();
                let collectable = total.saturating_sub(serverless.minimum_active_actors);
                for (key, _) in idle.into_iter().take(collectable) {
                    info!(actor = %key, "idle deactivation");
                    silo.deactivate(&key).await;
                }
            }
        });
        self.inner.tasks.lock().push(task);
    }

    /// Graceful shutdown: stop accepting work, drain every activation
    /// within the configured deadline, then stop the transport.
    pub async fn shutdown(&self) -> Result<(), SiloError> {
        {
            let mut state = self.inner.state.write();
            if *state != SiloState::Running {
                return Err(SiloError::ShuttingDown);
            }
            *state = SiloState::ShuttingDown;
        }
        info!(silo = %self.inner.config.silo_id, "silo shutting down");
        self.inner.cancel.cancel();

        let drain = async {
            let keys: Vec<ActorKey> = self
                .inner
                .activations
                .iter()
                .map(|e| e.key().clone())
                .collect();
            for key in keys {
                self.deactivate(&key).await;
            }
        };
        let drained =
            tokio::time::timeout(self.inner.config.shutdown_timeout, drain).await;

        self.inner.transport.stop().await?;
        let tasks = std::mem::take(&mut *self.inner.tasks.lock());
        for task in tasks {
            task.abort();
        }
        *self.inner.state.write() = SiloState::Stopped;

        match drained {
            Ok(()) => Ok(()),
            Err(_) => {
                warn!(silo = %self.inner.config.silo_id, "shutdown drain timed out");
                Err(SiloError::ShutdownTimeout(self.inner.config.shutdown_timeout))
            }
        }
    }
}

#[async_trait]
impl EnvelopeReceiver for Silo {
    async fn on_envelope(&self, envelope: Envelope) -> Option<Envelope> {
        if !self.is_running() {
            return Some(
                envelope.reply_err(&CallError::ActorFailure("silo shutting down".to_string())),
            );
        }

        let key = ActorKey::new(&envelope.actor_type, &envelope.actor_id);
        let activation = match self.resolve_activation(&key).await {
            Ok(activation) => activation,
            Err(error) => return Some(envelope.reply_err(&error)),
        };

        match activation.deliver(envelope.clone()).await {
            // The mailbox consumer resolves the receiver when the turn
            // (including retries) completes.
            Ok(rx) => rx.await.ok(),
            Err(post_error) => post_error
                .as_call_error()
                .map(|call_error| envelope.reply_err(&call_error)),
        }
    }
}
