// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::util::SiloId;

/// Strategy for choosing the silo that owns an actor identity.
///
/// `available` is the caller's current view of active members; a policy
/// never returns a silo outside that slice. `None` means no member can
/// host the identity (typically an empty cluster).
pub trait PlacementPolicy: Send + Sync + 'static {
    /// Pick the owning silo for `(actor_type, actor_id)`.
    fn select_silo(&self, actor_type: &str, actor_id: &str, available: &[SiloId])
        -> Option<SiloId>;
}
