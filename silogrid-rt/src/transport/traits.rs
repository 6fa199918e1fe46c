// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal module imports
use super::error::TransportError;
use crate::membership::SiloMeta;
use crate::message::Envelope;
use crate::util::SiloId;

/// The silo-side hook for inbound envelopes.
///
/// Injected into the transport explicitly; there is no global event bus.
/// Returning `None` means "no response for this envelope" (a silently
/// dropped message); the caller's pending entry then times out.
#[async_trait]
pub trait EnvelopeReceiver: Send + Sync + 'static {
    /// Dispatch one inbound request, producing its response.
    async fn on_envelope(&self, envelope: Envelope) -> Option<Envelope>;
}

/// Request/response envelope carrier between silos.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Bind listeners and start background work.
    async fn start(&self) -> Result<(), TransportError>;

    /// Tear everything down; pending requests fail with `Stopped`.
    async fn stop(&self) -> Result<(), TransportError>;

    /// Establish the persistent stream to a peer.
    async fn connect(&self, silo: &SiloMeta) -> Result<(), TransportError>;

    /// Drop the stream to a peer.
    async fn disconnect(&self, silo: &SiloId) -> Result<(), TransportError>;

    /// Register the local dispatch hook.
    fn set_receiver(&self, receiver: Arc<dyn EnvelopeReceiver>);

    /// Send a request and await its correlated response.
    ///
    /// Local targets short-circuit through the receiver; remote targets
    /// ride the peer stream. Either way the call is bounded by the
    /// configured request timeout.
    async fn send(&self, target: &SiloId, envelope: Envelope)
        -> Result<Envelope, TransportError>;
}
