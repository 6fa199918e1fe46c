// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use dashmap::DashMap;

// Layer 3: Internal module imports
use crate::util::SiloId;

/// Placement decision cache keyed by actor identity.
///
/// Each entry is stamped with the membership version it was computed
/// against. A lookup presents the current version; a stale stamp is a
/// miss, so a membership change invalidates the whole cache without any
/// coordinated sweep.
#[derive(Debug, Default)]
pub struct PlacementCache {
    entries: DashMap<(String, String), (u64, SiloId)>,
}

impl PlacementCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached decision for the identity, if computed at `current_version`.
    pub fn get(&self, actor_type: &str, actor_id: &str, current_version: u64) -> Option<SiloId> {
        let key = (actor_type.to_string(), actor_id.to_string());
        // Read under the entry ref, release it, then evict stale entries;
        // removing while a ref into the same shard is held would deadlock.
        let cached = self.entries.get(&key).map(|entry| entry.value().clone());
        match cached {
            Some((version, silo)) if version == current_version => Some(silo),
            Some(_) => {
                self.entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Record a decision computed at `version`.
    pub fn insert(&self, actor_type: &str, actor_id: &str, version: u64, silo: SiloId) {
        self.entries
            .insert((actor_type.to_string(), actor_id.to_string()), (version, silo));
    }

    /// Drop a single identity's decision.
    pub fn invalidate(&self, actor_type: &str, actor_id: &str) {
        self.entries
            .remove(&(actor_type.to_string(), actor_id.to_string()));
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of cached decisions (stale ones included until touched).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
