//! Flat consistent-hash ring with virtual nodes.

// Layer 1: Standard library imports
use std::collections::BTreeMap;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::{Mutex, RwLock};

// Layer 3: Internal module imports
use super::hash::ring_hash_str;
use crate::util::SiloId;

/// Default virtual nodes contributed per silo.
pub const DEFAULT_VIRTUAL_NODES: usize = 150;

/// Published, immutable view of the ring.
///
/// `points` is sorted by hash position; a lookup binary-searches for the
/// first point at or after the key's hash, wrapping to the start.
#[derive(Debug, Default)]
struct RingState {
    points: Vec<(u32, SiloId)>,
}

impl RingState {
    fn build(members: &BTreeMap<SiloId, usize>) -> Self {
        let mut points = Vec::with_capacity(members.values().sum());
        for (silo, vnodes) in members {
            for i in 0..*vnodes {
                points.push((ring_hash_str(&format!("{}:{}", silo.as_str(), i)), silo.clone()));
            }
        }
        // Sort by position; ties break on silo id so rebuilds are identical.
        points.sort();
        Self { points }
    }

    fn lookup_hash(&self, hash: u32) -> Option<&SiloId> {
        if self.points.is_empty() {
            return None;
        }
        let idx = self.points.partition_point(|(h, _)| *h < hash);
        let idx = if idx == self.points.len() { 0 } else { idx };
        Some(&self.points[idx].1)
    }
}

/// Consistent-hash ring mapping keys to silos.
///
/// Each member contributes `V` virtual nodes (default 150) whose positions
/// are `hash("siloId:i")`. Adding or removing a member only re-maps the
/// keys whose clockwise successor crossed the affected arcs.
///
/// # Mutation discipline
///
/// Writers serialize on a single lock, rebuild the point array from the
/// membership map and publish it as a fresh `Arc`. Readers clone the
/// current `Arc` and search it without further synchronization, so a
/// reader never observes a half-built ring.
#[derive(Debug)]
pub struct HashRing {
    virtual_nodes: usize,
    members: Mutex<BTreeMap<SiloId, usize>>,
    snapshot: RwLock<Arc<RingState>>,
}

impl HashRing {
    /// Create an empty ring with the default virtual-node count.
    pub fn new() -> Self {
        Self::with_virtual_nodes(DEFAULT_VIRTUAL_NODES)
    }

    /// Create an empty ring with a custom virtual-node count per silo.
    pub fn with_virtual_nodes(virtual_nodes: usize) -> Self {
        Self {
            virtual_nodes: virtual_nodes.max(1),
            members: Mutex::new(BTreeMap::new()),
            snapshot: RwLock::new(Arc::new(RingState::default())),
        }
    }

    /// Add a silo with the ring's default virtual-node count.
    pub fn add_silo(&self, silo: &SiloId) {
        self.add_silo_weighted(silo, self.virtual_nodes);
    }

    /// Add a silo with an explicit virtual-node count.
    ///
    /// Re-adding an existing silo updates its weight.
    pub fn add_silo_weighted(&self, silo: &SiloId, virtual_nodes: usize) {
        let mut members = self.members.lock();
        members.insert(silo.clone(), virtual_nodes.max(1));
        self.publish(&members);
    }

    /// Remove a silo; its arcs fall to the clockwise successors.
    pub fn remove_silo(&self, silo: &SiloId) {
        let mut members = self.members.lock();
        if members.remove(silo).is_some() {
            self.publish(&members);
        }
    }

    fn publish(&self, members: &BTreeMap<SiloId, usize>) {
        let state = Arc::new(RingState::build(members));
        *self.snapshot.write() = state;
    }

    fn snapshot(&self) -> Arc<RingState> {
        Arc::clone(&self.snapshot.read())
    }

    /// Map a key to its owning silo, if the ring is non-empty.
    pub fn lookup(&self, key: &str) -> Option<SiloId> {
        self.lookup_hash(ring_hash_str(key))
    }

    /// Map a precomputed hash position to its owning silo.
    pub fn lookup_hash(&self, hash: u32) -> Option<SiloId> {
        self.snapshot().lookup_hash(hash).cloned()
    }

    /// Current members.
    pub fn silos(&self) -> Vec<SiloId> {
        self.members.lock().keys().cloned().collect()
    }

    /// Number of member silos.
    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    /// Whether no silo is registered.
    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new()
    }
}
