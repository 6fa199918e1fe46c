// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use bytes::Bytes;

// Layer 3: Internal module imports
use super::error::DispatchError;
use crate::actor::{ActorContext, ActorInstance};

/// Per-actor-type invocation adapter.
///
/// An implementation knows every method of its actor type: it decodes the
/// length-prefixed parameters, downcasts the instance to the concrete
/// type and encodes the return value. Generated code emits one of these
/// per actor interface; the runtime only ever sees the trait.
#[async_trait]
pub trait MethodDispatcher: Send + Sync + 'static {
    /// The actor type this dispatcher serves.
    fn actor_type(&self) -> &str;

    /// Invoke `method` on a live instance with the framed `payload`,
    /// returning the framed result.
    async fn invoke(
        &self,
        instance: &mut dyn ActorInstance,
        ctx: &mut ActorContext,
        method: &str,
        payload: &Bytes,
    ) -> Result<Bytes, DispatchError>;
}
