//! Placement policies and the per-identity decision cache.

mod cache;
mod policies;
mod traits;

pub use cache::PlacementCache;
pub use policies::{
    ConsistentHashPlacement, GeoPlacement, LocalPreferredPlacement, RandomPlacement,
    RoundRobinPlacement,
};
pub use traits::PlacementPolicy;
