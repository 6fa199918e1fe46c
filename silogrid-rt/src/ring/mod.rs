//! Consistent-hash placement rings.
//!
//! [`HashRing`] is the flat ring used for single-tier clusters;
//! [`HierarchicalRing`] layers region, zone and silo rings for geo-aware
//! deployments. Both follow the same mutation discipline: writers take a
//! lock, rebuild a copy and atomically publish it; readers work on a
//! snapshot and need no synchronization.

mod consistent;
mod hash;
mod hierarchical;

pub use consistent::{HashRing, DEFAULT_VIRTUAL_NODES};
pub use hash::{ring_hash, ring_hash_str};
pub use hierarchical::{FallbackStrategy, GeoPreferences, HierarchicalRing, SiloPlacement};
