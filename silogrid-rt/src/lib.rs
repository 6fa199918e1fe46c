//! # silogrid-rt - Distributed Virtual Actor Runtime
//!
//! A cluster of cooperating processes ("silos") hosts long-lived,
//! single-threaded, identity-addressable actors and routes remote
//! invocations to them with at-most-one execution per actor identity.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use silogrid_rt::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let silo_id = SiloId::new("silo-a");
//!     let membership = Arc::new(MembershipRegistry::new(silo_id.clone()));
//!
//!     // 1. Register factories and dispatchers (generated or hand written),
//!     //    then freeze the registries.
//!     let factories = Arc::new(ActorFactoryRegistry::new());
//!     factories.register("Counter", Arc::new(|id: &str| new_counter(id)))?;
//!     factories.freeze();
//!
//!     let dispatchers = Arc::new(DispatcherRegistry::new());
//!     dispatchers.register(Arc::new(CounterDispatcher))?;
//!     dispatchers.freeze();
//!
//!     // 2. Compose and start the silo.
//!     let config = SiloConfig::new(silo_id.clone(), "0.0.0.0:7400");
//!     let transport = Arc::new(TcpTransport::new(
//!         silo_id.clone(),
//!         config.bind_addr.clone(),
//!         config.transport.clone(),
//!         config.channel_pool.clone(),
//!     ));
//!     let placement = Arc::new(ConsistentHashPlacement::new(Arc::clone(&membership)));
//!     let silo = Silo::new(config, membership, placement, transport, factories, dispatchers);
//!     silo.start().await?;
//!
//!     // 3. Call actors by identity, anywhere in the cluster.
//!     let result = silo.call("Counter", "c-42", "Increment", Bytes::new()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Subsystems
//!
//! ## Actor runtime
//! - [`actor`] - Actor instances, activation lifecycle and turn context
//! - [`mailbox`] - Bounded queue, turn loop, adaptive sizing, circuit
//!   breaker, rate limiting
//! - [`supervisor`] - Children, restart backoff and escalation
//! - [`dispatch`] - Method-name dispatch registry
//! - [`dlq`] - Retry schedule and dead-letter capture
//!
//! ## Placement & membership
//! - [`ring`] - Flat and hierarchical consistent-hash rings
//! - [`membership`] - Silo directory and ring maintenance
//! - [`placement`] - Placement policies and the decision cache
//!
//! ## Transport & envelope protocol
//! - [`message`] - The envelope and per-parameter payload framing
//! - [`transport`] - Framed peer streams, correlation, local
//!   short-circuit
//!
//! ## Persistence hooks
//! - [`storage`] - State storage with optimistic concurrency
//! - [`reliable`] - Transactional outbox and idempotent inbox
//! - [`reminder`] - Durable timers firing on the owning silo
//!
//! ## Infrastructure
//! - [`system`] - Silo composition, configuration, metadata queries
//! - [`util`] - Identity newtypes
//!
//! # Guarantees
//!
//! - **Turn-based execution**: an activation processes exactly one
//!   message at a time; FIFO per producer.
//! - **Deterministic placement**: a key maps to one silo under a stable
//!   ring; membership changes re-map only the affected arcs.
//! - **At-least-once messaging**: retries plus the idempotent inbox;
//!   exactly-once is explicitly not claimed.
//! - **Failures as values**: actor errors bubble as `Result`s to the
//!   mailbox loop and supervisors, never as panics across a mailbox.

pub mod actor;
pub mod dispatch;
pub mod dlq;
pub mod mailbox;
pub mod membership;
pub mod message;
pub mod placement;
pub mod reliable;
pub mod reminder;
pub mod ring;
pub mod storage;
pub mod supervisor;
pub mod system;
pub mod transport;
pub mod util;

// Re-export commonly used types
pub use actor::{Activation, ActorContext, ActorError, ActorFactoryRegistry, ActorInstance};
pub use dispatch::{DispatchError, DispatcherRegistry, MethodDispatcher, RegistryError};
pub use dlq::{DeadLetter, DeadLetterQueue, DlqOptions, RetryPolicy};
pub use mailbox::{
    AdaptiveConfig, CircuitBreakerConfig, CircuitState, ExcessAction, FullMode, Mailbox,
    MailboxOptions, PostError, RateLimitConfig,
};
pub use membership::{MembershipRegistry, SiloMeta, SiloStatus};
pub use message::{CallError, Envelope, FramingError, ParamReader, ParamWriter};
pub use placement::{
    ConsistentHashPlacement, GeoPlacement, LocalPreferredPlacement, PlacementPolicy,
    RandomPlacement, RoundRobinPlacement,
};
pub use reliable::{
    InMemoryInbox, InMemoryOutbox, InboxStore, OutboxDeliver, OutboxDrainer, OutboxMessage,
    OutboxStore,
};
pub use reminder::{InMemoryReminderTable, Reminder, ReminderScanner, ReminderTable};
pub use ring::{FallbackStrategy, GeoPreferences, HashRing, HierarchicalRing};
pub use storage::{InMemoryStateStorage, StateStorage, StorageError, VersionedState};
pub use supervisor::{
    Directive, RestartHistory, SupervisedChild, SupervisionOptions, SupervisionStrategy,
    Supervisor, SupervisorError,
};
pub use system::{ActorInfo, ActorPage, ActorQuery, ServerlessOptions, Silo, SiloConfig, SiloError};
pub use transport::{EnvelopeReceiver, TcpTransport, Transport, TransportError};
pub use util::{ActorKey, MessageId, SiloId};

/// Convenience imports for silo assembly.
pub mod prelude {
    pub use crate::actor::{ActorContext, ActorError, ActorFactoryRegistry, ActorInstance};
    pub use crate::dispatch::{DispatcherRegistry, MethodDispatcher};
    pub use crate::membership::{MembershipRegistry, SiloMeta};
    pub use crate::message::{CallError, Envelope, ParamReader, ParamWriter};
    pub use crate::placement::{ConsistentHashPlacement, LocalPreferredPlacement};
    pub use crate::system::{Silo, SiloConfig};
    pub use crate::transport::TcpTransport;
    pub use crate::util::{ActorKey, MessageId, SiloId};
}
