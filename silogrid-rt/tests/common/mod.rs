//! Shared fixtures: a counter actor, its dispatcher and silo assembly.

#![allow(clippy::unwrap_used)]
#![allow(dead_code)]

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use silogrid_rt::dispatch::DispatchError;
use silogrid_rt::placement::ConsistentHashPlacement;
use silogrid_rt::prelude::*;
use silogrid_rt::transport::Transport;

/// Counter actor: the workhorse of the integration suite.
#[derive(Default)]
pub struct CounterActor {
    pub count: u64,
}

impl ActorInstance for CounterActor {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Dispatcher for [`CounterActor`], recording invocation instants.
pub struct CounterDispatcher {
    pub invocations: Arc<Mutex<Vec<Instant>>>,
}

impl CounterDispatcher {
    pub fn new() -> Self {
        Self {
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl MethodDispatcher for CounterDispatcher {
    fn actor_type(&self) -> &str {
        "Counter"
    }

    async fn invoke(
        &self,
        instance: &mut dyn ActorInstance,
        _ctx: &mut ActorContext,
        method: &str,
        _payload: &Bytes,
    ) -> Result<Bytes, DispatchError> {
        self.invocations.lock().push(Instant::now());
        let counter = instance
            .as_any_mut()
            .downcast_mut::<CounterActor>()
            .ok_or_else(|| DispatchError::Failed("wrong instance type".to_string()))?;
        match method {
            "Increment" => {
                counter.count += 1;
                Ok(Bytes::new())
            }
            "Get" => Ok(Bytes::from(counter.count.to_le_bytes().to_vec())),
            "Boom" => Err(DispatchError::Failed("bad".to_string())),
            other => Err(DispatchError::UnknownMethod {
                actor_type: "Counter".to_string(),
                method: other.to_string(),
            }),
        }
    }
}

/// A running silo plus the collaborators tests poke at.
pub struct TestSilo {
    pub silo: Silo,
    pub membership: Arc<MembershipRegistry>,
    pub transport: Arc<TcpTransport>,
    pub addr: SocketAddr,
    pub invocations: Arc<Mutex<Vec<Instant>>>,
}

impl TestSilo {
    pub fn meta(&self) -> SiloMeta {
        SiloMeta::new(self.silo.silo_id().clone(), self.addr.to_string())
    }
}

/// Route runtime events to the test output when `RUST_LOG` asks for them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Assemble and start a silo bound to an ephemeral local port.
pub async fn spawn_silo(name: &str, tweak: impl FnOnce(&mut SiloConfig)) -> TestSilo {
    init_tracing();
    let silo_id = SiloId::new(name);
    let membership = Arc::new(MembershipRegistry::new(silo_id.clone()));

    let mut config = SiloConfig::new(silo_id.clone(), "127.0.0.1:0");
    config.transport.request_timeout = Duration::from_secs(3);
    tweak(&mut config);

    let transport = Arc::new(TcpTransport::new(
        silo_id.clone(),
        config.bind_addr.clone(),
        config.transport.clone(),
        config.channel_pool.clone(),
    ));

    let factories = Arc::new(ActorFactoryRegistry::new());
    factories
        .register(
            "Counter",
            Arc::new(|_id: &str| Box::new(CounterActor::default()) as Box<dyn ActorInstance>),
        )
        .unwrap();
    factories.freeze();

    let dispatcher = CounterDispatcher::new();
    let invocations = Arc::clone(&dispatcher.invocations);
    let dispatchers = Arc::new(DispatcherRegistry::new());
    dispatchers.register(Arc::new(dispatcher)).unwrap();
    dispatchers.freeze();

    let placement = Arc::new(ConsistentHashPlacement::new(Arc::clone(&membership)));

    let silo = Silo::new(
        config,
        Arc::clone(&membership),
        placement,
        Arc::clone(&transport) as Arc<dyn Transport>,
        factories,
        dispatchers,
    );
    silo.start().await.unwrap();
    let addr = transport.local_addr().unwrap();

    membership.register(SiloMeta::new(silo_id, addr.to_string()));

    TestSilo {
        silo,
        membership,
        transport,
        addr,
        invocations,
    }
}

/// Join two running silos into one cluster (mutual membership + streams).
pub async fn join(a: &TestSilo, b: &TestSilo) {
    a.membership.register(b.meta());
    b.membership.register(a.meta());
    a.transport.connect(&b.meta()).await.unwrap();
    b.transport.connect(&a.meta()).await.unwrap();
}

pub fn counter_value(bytes: &Bytes) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}
