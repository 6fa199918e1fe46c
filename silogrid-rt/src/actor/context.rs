// Layer 1: Standard library imports
use std::collections::HashMap;

// Layer 2: Third-party crate imports
use tokio_util::sync::CancellationToken;

// Layer 3: Internal module imports
use crate::message::Envelope;
use crate::util::{ActorKey, MessageId};

/// Explicit per-turn context.
///
/// There is no ambient "current context": the context is a value passed
/// into every dispatched method and lifecycle hook, and it flows across
/// suspensions simply by being owned by the turn's future. Sub-calls get
/// a [`ActorContext::child_scope`], so nesting behaves like a stack:
/// the parent's context is untouched when the child returns.
#[derive(Debug)]
pub struct ActorContext {
    actor_type: String,
    actor_id: String,
    correlation_id: Option<MessageId>,
    request_id: MessageId,
    metadata: HashMap<String, String>,
    cancellation: CancellationToken,
    depth: usize,
}

impl ActorContext {
    /// Context for lifecycle hooks (no originating request).
    pub fn lifecycle(key: &ActorKey, cancellation: CancellationToken) -> Self {
        Self {
            actor_type: key.actor_type.clone(),
            actor_id: key.actor_id.clone(),
            correlation_id: None,
            request_id: MessageId::new(),
            metadata: HashMap::new(),
            cancellation,
            depth: 0,
        }
    }

    /// Context for one dispatched envelope.
    pub fn for_envelope(envelope: &Envelope, cancellation: CancellationToken) -> Self {
        Self {
            actor_type: envelope.actor_type.clone(),
            actor_id: envelope.actor_id.clone(),
            correlation_id: envelope.correlation_id,
            request_id: envelope.message_id,
            metadata: HashMap::new(),
            cancellation,
            depth: 0,
        }
    }

    /// Nested context for a sub-call made inside this turn.
    ///
    /// Inherits identity, correlation and metadata; gets a fresh request
    /// id and a child cancellation token. Returning from the sub-call
    /// restores the parent implicitly (LIFO).
    pub fn child_scope(&self) -> Self {
        Self {
            actor_type: self.actor_type.clone(),
            actor_id: self.actor_id.clone(),
            correlation_id: self.correlation_id.or(Some(self.request_id)),
            request_id: MessageId::new(),
            metadata: self.metadata.clone(),
            cancellation: self.cancellation.child_token(),
            depth: self.depth + 1,
        }
    }

    /// The actor type this turn runs under.
    pub fn actor_type(&self) -> &str {
        &self.actor_type
    }

    /// The actor id this turn runs under.
    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    /// Trace correlation id, if the caller supplied one.
    pub fn correlation_id(&self) -> Option<MessageId> {
        self.correlation_id
    }

    /// Id of the request driving this turn.
    pub fn request_id(&self) -> MessageId {
        self.request_id
    }

    /// Cancellation for the turn; honored at every I/O suspension.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Read-only metadata view.
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// Mutable metadata; scoped to this context and its children.
    pub fn metadata_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.metadata
    }

    /// Nesting depth (0 for the turn's root context).
    pub fn depth(&self) -> usize {
        self.depth
    }
}
