// Layer 1: Standard library imports
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use bytes::Bytes;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex as PlMutex, RwLock as PlRwLock};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// Layer 3: Internal module imports
use super::correlation::PendingRequests;
use super::error::TransportError;
use super::traits::{EnvelopeReceiver, Transport};
use crate::membership::SiloMeta;
use crate::message::{CallError, Envelope};
use crate::util::SiloId;
use async_trait::async_trait;

/// Request-level transport tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportOptions {
    /// Deadline for every `send`.
    pub request_timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Peer-connection hygiene tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelPoolOptions {
    /// Connections older than this are recycled.
    pub max_lifetime: Duration,

    /// How often the hygiene sweep runs.
    pub health_check_interval: Duration,

    /// Whether idle connections are closed at all.
    pub dispose_idle_channels: bool,

    /// Idle age beyond which a connection is closed.
    pub idle_timeout: Duration,
}

impl Default for ChannelPoolOptions {
    fn default() -> Self {
        Self {
            max_lifetime: Duration::from_secs(30 * 60),
            health_check_interval: Duration::from_secs(5 * 60),
            dispose_idle_channels: true,
            idle_timeout: Duration::from_secs(10 * 60),
        }
    }
}

struct PeerHandle {
    outgoing: mpsc::UnboundedSender<Envelope>,
    created_at: Instant,
    last_used: Arc<PlMutex<Instant>>,
}

type ReceiverSlot = Arc<PlRwLock<Option<Arc<dyn EnvelopeReceiver>>>>;

/// TCP transport: one persistent framed stream per dialed peer.
///
/// Each connection runs a single loop multiplexing the outbound queue
/// and the inbound stream with `select!`. Outbound envelopes (requests
/// and responses alike) funnel through the per-connection queue, so
/// writes onto the stream are naturally serialized. Inbound replies
/// complete the shared pending table; inbound requests dispatch through
/// the injected receiver on their own task so a slow turn never stalls
/// the stream.
pub struct TcpTransport {
    local: SiloId,
    bind_addr: String,
    options: TransportOptions,
    pool: ChannelPoolOptions,
    receiver: ReceiverSlot,
    pending: Arc<PendingRequests>,
    peers: Arc<DashMap<SiloId, PeerHandle>>,
    bound: PlMutex<Option<SocketAddr>>,
    tasks: PlMutex<Vec<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl TcpTransport {
    /// Create a transport for the local silo, listening on `bind_addr`.
    pub fn new(
        local: SiloId,
        bind_addr: impl Into<String>,
        options: TransportOptions,
        pool: ChannelPoolOptions,
    ) -> Self {
        Self {
            local,
            bind_addr: bind_addr.into(),
            options,
            pool,
            receiver: Arc::new(PlRwLock::new(None)),
            pending: Arc::new(PendingRequests::new()),
            peers: Arc::new(DashMap::new()),
            bound: PlMutex::new(None),
            tasks: PlMutex::new(Vec::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// The address the listener actually bound (useful with port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.bound.lock()
    }

    /// Outstanding request count (diagnostics).
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Connected peer count.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    fn spawn_connection(&self, stream: TcpStream) -> mpsc::UnboundedSender<Envelope> {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(connection_loop(
            Framed::new(stream, LengthDelimitedCodec::new()),
            out_rx,
            out_tx.clone(),
            Arc::clone(&self.pending),
            Arc::clone(&self.receiver),
            self.cancel.child_token(),
        ));
        self.tasks.lock().push(task);
        out_tx
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn start(&self) -> Result<(), TransportError> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        let addr = listener.local_addr()?;
        *self.bound.lock() = Some(addr);
        info!(silo = %self.local, %addr, "transport listening");

        // Accept loop: every inbound connection gets its own loop; the
        // peer answers on the stream it dialed.
        {
            let cancel = self.cancel.child_token();
            let pending = Arc::clone(&self.pending);
            let receiver = Arc::clone(&self.receiver);
            let accept = tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        accepted = listener.accept() => match accepted {
                            Ok((stream, peer_addr)) => {
                                debug!(%peer_addr, "peer connected");
                                let (out_tx, out_rx) = mpsc::unbounded_channel();
                                tokio::spawn(connection_loop(
                                    Framed::new(stream, LengthDelimitedCodec::new()),
                                    out_rx,
                                    out_tx,
                                    Arc::clone(&pending),
                                    Arc::clone(&receiver),
                                    cancel.child_token(),
                                ));
                            }
                            Err(err) => {
                                warn!(error = %err, "accept failed");
                            }
                        }
                    }
                }
            });
            self.tasks.lock().push(accept);
        }

        // Connection hygiene sweep.
        {
            let cancel = self.cancel.child_token();
            let peers = Arc::clone(&self.peers);
            let pool = self.pool.clone();
            let sweep = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(pool.health_check_interval);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => {}
                    }
                    peers.retain(|silo, handle| {
                        let expired = handle.created_at.elapsed() > pool.max_lifetime;
                        let idle = pool.dispose_idle_channels
                            && handle.last_used.lock().elapsed() > pool.idle_timeout;
                        if expired || idle {
                            debug!(%silo, expired, idle, "recycling peer connection");
                            false
                        } else {
                            true
                        }
                    });
                }
            });
            self.tasks.lock().push(sweep);
        }

        Ok(())
    }

    async fn stop(&self) -> Result<(), TransportError> {
        self.cancel.cancel();
        self.peers.clear();
        self.pending.fail_all();
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            task.abort();
        }
        info!(silo = %self.local, "transport stopped");
        Ok(())
    }

    async fn connect(&self, silo: &SiloMeta) -> Result<(), TransportError> {
        if self.peers.contains_key(&silo.id) {
            return Ok(());
        }
        let stream = TcpStream::connect(&silo.endpoint).await?;
        let outgoing = self.spawn_connection(stream);
        self.peers.insert(
            silo.id.clone(),
            PeerHandle {
                outgoing,
                created_at: Instant::now(),
                last_used: Arc::new(PlMutex::new(Instant::now())),
            },
        );
        info!(silo = %self.local, peer = %silo.id, endpoint = %silo.endpoint, "peer stream up");
        Ok(())
    }

    async fn disconnect(&self, silo: &SiloId) -> Result<(), TransportError> {
        if self.peers.remove(silo).is_some() {
            info!(silo = %self.local, peer = %silo, "peer stream down");
        }
        Ok(())
    }

    fn set_receiver(&self, receiver: Arc<dyn EnvelopeReceiver>) {
        *self.receiver.write() = Some(receiver);
    }

    async fn send(
        &self,
        target: &SiloId,
        envelope: Envelope,
    ) -> Result<Envelope, TransportError> {
        let message_id = envelope.message_id;
        let rx = self.pending.register(message_id);
        // Drops the entry on every exit path, including the caller
        // cancelling this future mid-await.
        let _guard = self.pending.guard(message_id);

        if *target == self.local {
            // Local short-circuit: same receiver hook, same correlation
            // table, no network.
            let receiver = match self.receiver.read().as_ref() {
                Some(receiver) => Arc::clone(receiver),
                None => return Err(TransportError::NoReceiver),
            };
            let pending = Arc::clone(&self.pending);
            tokio::spawn(async move {
                if let Some(response) = receiver.on_envelope(envelope).await {
                    pending.complete(response);
                }
            });
        } else {
            let delivered = match self.peers.get(target) {
                Some(peer) => {
                    *peer.last_used.lock() = Instant::now();
                    peer.outgoing.send(envelope).is_ok()
                }
                None => false,
            };
            if !delivered {
                return Err(TransportError::NotConnected(target.clone()));
            }
        }

        match tokio::time::timeout(self.options.request_timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(TransportError::Stopped),
            Err(_) => Err(TransportError::Timeout),
        }
    }
}

/// One loop per connection: drain the outbound queue onto the stream,
/// route inbound frames. Writes are serialized because this loop is the
/// only writer of its stream.
async fn connection_loop(
    mut framed: Framed<TcpStream, LengthDelimitedCodec>,
    mut out_rx: mpsc::UnboundedReceiver<Envelope>,
    out_tx: mpsc::UnboundedSender<Envelope>,
    pending: Arc<PendingRequests>,
    receiver: ReceiverSlot,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            outbound = out_rx.recv() => match outbound {
                Some(envelope) => match envelope.to_wire() {
                    Ok(bytes) => {
                        if framed.send(bytes).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "dropping unencodable envelope");
                    }
                },
                None => break,
            },
            inbound = framed.next() => match inbound {
                Some(Ok(frame)) => {
                    route_inbound(frame.freeze(), &pending, &receiver, &out_tx);
                }
                Some(Err(err)) => {
                    warn!(error = %err, "stream read failed");
                    break;
                }
                None => break,
            },
        }
    }
}

fn route_inbound(
    frame: Bytes,
    pending: &Arc<PendingRequests>,
    receiver: &ReceiverSlot,
    out_tx: &mpsc::UnboundedSender<Envelope>,
) {
    let envelope = match Envelope::from_wire(&frame) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(error = %err, "dropping undecodable frame");
            return;
        }
    };

    if envelope.is_reply() {
        pending.complete(envelope);
        return;
    }

    let receiver = receiver.read().as_ref().map(Arc::clone);
    match receiver {
        Some(receiver) => {
            // Dispatch off the stream loop; the response re-enters the
            // outbound queue, which serializes the write.
            let out_tx = out_tx.clone();
            tokio::spawn(async move {
                if let Some(response) = receiver.on_envelope(envelope).await {
                    let _ = out_tx.send(response);
                }
            });
        }
        None => {
            let _ = out_tx.send(
                envelope.reply_err(&CallError::ActorFailure("no receiver".to_string())),
            );
        }
    }
}
