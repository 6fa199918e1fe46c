// Layer 1: Standard library imports
use std::any::Any;

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal module imports
use super::context::ActorContext;
use super::error::ActorError;

/// A live actor instance hosted by an activation.
///
/// Implementations are plain structs holding the actor's in-memory state;
/// methods are invoked through the type's [`MethodDispatcher`]
/// (`crate::dispatch`), which downcasts via [`ActorInstance::as_any_mut`].
/// The registry addresses actors by type-name string, so the seam is
/// object-safe by design.
///
/// # Lifecycle
///
/// `on_activate` runs before the first message is dispatched; load state
/// here if the actor is persistent. `on_deactivate` runs on idle timeout,
/// explicit deactivation or silo shutdown, strictly after the mailbox has
/// drained. Both observe cancellation through
/// [`ActorContext::cancellation`].
#[async_trait]
pub trait ActorInstance: Send + 'static {
    /// Hook before the first dispatched message.
    async fn on_activate(&mut self, _ctx: &mut ActorContext) -> Result<(), ActorError> {
        Ok(())
    }

    /// Hook after the mailbox drained, before the activation is dropped.
    async fn on_deactivate(&mut self, _ctx: &mut ActorContext) -> Result<(), ActorError> {
        Ok(())
    }

    /// Downcast support for dispatchers.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
