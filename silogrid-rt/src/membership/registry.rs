// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

// Layer 2: Third-party crate imports
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info};

// Layer 3: Internal module imports
use super::types::{SiloMeta, SiloStatus};
use crate::ring::{HashRing, HierarchicalRing, SiloPlacement};
use crate::util::{ActorKey, SiloId};

/// Silo directory plus the rings derived from it.
///
/// Every mutation updates the directory, rebuilds the affected ring
/// membership under the rings' copy-on-write discipline, bumps a
/// monotonic change version and publishes it on a watch channel.
/// Placement caches stamp entries with the version they observed; a stale
/// stamp is simply a cache miss, which makes invalidation lock-free.
pub struct MembershipRegistry {
    local: SiloId,
    silos: RwLock<HashMap<SiloId, SiloMeta>>,
    ring: HashRing,
    geo: HierarchicalRing,
    version: AtomicU64,
    watch_tx: watch::Sender<u64>,
}

impl MembershipRegistry {
    /// Create a registry for the given local silo id.
    pub fn new(local: SiloId) -> Self {
        let (watch_tx, _) = watch::channel(0);
        Self {
            local,
            silos: RwLock::new(HashMap::new()),
            ring: HashRing::new(),
            geo: HierarchicalRing::new(),
            version: AtomicU64::new(0),
            watch_tx,
        }
    }

    /// The local silo's id.
    pub fn local(&self) -> &SiloId {
        &self.local
    }

    /// Register or update a member. Active members join the rings;
    /// draining/dead members leave them but stay in the directory.
    pub fn register(&self, meta: SiloMeta) {
        {
            let mut silos = self.silos.write();
            if meta.is_active() {
                self.ring.add_silo(&meta.id);
                if let (Some(region), Some(zone)) = (&meta.region, &meta.zone) {
                    self.geo.add_silo(SiloPlacement {
                        silo: meta.id.clone(),
                        region: region.clone(),
                        zone: zone.clone(),
                        shard_group: meta.shard_group.clone(),
                    });
                }
            } else {
                self.ring.remove_silo(&meta.id);
                self.geo.remove_silo(&meta.id);
            }
            info!(silo = %meta.id, status = ?meta.status, "membership register");
            silos.insert(meta.id.clone(), meta);
        }
        self.bump();
    }

    /// Change a member's status in place.
    pub fn mark_status(&self, silo: &SiloId, status: SiloStatus) {
        let updated = {
            let mut silos = self.silos.write();
            match silos.get_mut(silo) {
                Some(meta) => {
                    meta.status = status;
                    if meta.is_active() {
                        self.ring.add_silo(&meta.id);
                        if let (Some(region), Some(zone)) = (&meta.region, &meta.zone) {
                            self.geo.add_silo(SiloPlacement {
                                silo: meta.id.clone(),
                                region: region.clone(),
                                zone: zone.clone(),
                                shard_group: meta.shard_group.clone(),
                            });
                        }
                    } else {
                        self.ring.remove_silo(silo);
                        self.geo.remove_silo(silo);
                    }
                    true
                }
                None => false,
            }
        };
        if updated {
            debug!(%silo, ?status, "membership status change");
            self.bump();
        }
    }

    /// Remove a member entirely.
    pub fn remove(&self, silo: &SiloId) {
        let removed = self.silos.write().remove(silo).is_some();
        if removed {
            self.ring.remove_silo(silo);
            self.geo.remove_silo(silo);
            info!(%silo, "membership remove");
            self.bump();
        }
    }

    fn bump(&self) {
        let v = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.watch_tx.send(v);
    }

    /// Directory entry for a member.
    pub fn get(&self, silo: &SiloId) -> Option<SiloMeta> {
        self.silos.read().get(silo).cloned()
    }

    /// All active members.
    pub fn active_silos(&self) -> Vec<SiloMeta> {
        let mut silos: Vec<SiloMeta> = self
            .silos
            .read()
            .values()
            .filter(|m| m.is_active())
            .cloned()
            .collect();
        silos.sort_by(|a, b| a.id.cmp(&b.id));
        silos
    }

    /// Ids of all active members, sorted for deterministic iteration.
    pub fn active_silo_ids(&self) -> Vec<SiloId> {
        self.active_silos().into_iter().map(|m| m.id).collect()
    }

    /// Active members advertising at least the given version string
    /// (lexicographic compare on the version field).
    pub fn active_silos_at_least(&self, min_version: &str) -> Vec<SiloMeta> {
        self.active_silos()
            .into_iter()
            .filter(|m| m.version.as_str() >= min_version)
            .collect()
    }

    /// The silo an actor identity maps to under the current ring.
    pub fn owner_of(&self, key: &ActorKey) -> Option<SiloId> {
        self.ring.lookup(&key.ring_key())
    }

    /// Whether the local silo currently owns the identity.
    pub fn is_local_owner(&self, key: &ActorKey) -> bool {
        self.owner_of(key).as_ref() == Some(&self.local)
    }

    /// Monotonic membership change version.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Observe membership changes without polling.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.watch_tx.subscribe()
    }

    /// The flat placement ring.
    pub fn ring(&self) -> &HashRing {
        &self.ring
    }

    /// The hierarchical placement ring.
    pub fn geo(&self) -> &HierarchicalRing {
        &self.geo
    }
}
