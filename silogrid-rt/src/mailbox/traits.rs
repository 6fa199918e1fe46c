// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal module imports
use crate::actor::ActorError;
use crate::message::Envelope;

/// The mailbox's view of the activation it feeds.
///
/// `handle` runs one turn: decode, invoke, respond. An `Err` means user
/// code failed and the consumer loop owns retry/dead-letter handling;
/// protocol-level problems (unknown method, malformed payload) are the
/// handler's to answer directly and return `Ok`.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Execute one turn for the envelope.
    async fn handle(&self, envelope: &Envelope) -> Result<(), ActorError>;

    /// Called once the retry budget for the envelope is exhausted.
    ///
    /// The handler captures the dead letter and answers the caller with
    /// the final failure.
    async fn on_dead_letter(&self, envelope: &Envelope, error: &ActorError, retry_count: u32);
}
