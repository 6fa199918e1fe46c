//! Utility types shared across the runtime.
//!
//! Identity newtypes (`SiloId`, `ActorKey`, `MessageId`) following the
//! newtype-over-primitive pattern: cheap to clone, `Display` for logging,
//! serde for the wire.

mod ids;

pub use ids::{ActorKey, MessageId, SiloId};
