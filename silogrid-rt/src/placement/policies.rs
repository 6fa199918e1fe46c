//! Built-in placement policies.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use rand::Rng;

// Layer 3: Internal module imports
use super::traits::PlacementPolicy;
use crate::membership::MembershipRegistry;
use crate::ring::{ring_hash_str, GeoPreferences};
use crate::util::{ActorKey, SiloId};

/// Consistent-hash placement over the membership ring.
///
/// The ring key is the `"actorType:actorId"` composite. If the ring's
/// answer is not in `available` (a member left between the ring rebuild
/// and this call), the policy degrades to a deterministic pick over
/// `available` so the decision stays stable for the identity.
pub struct ConsistentHashPlacement {
    membership: Arc<MembershipRegistry>,
}

impl ConsistentHashPlacement {
    /// Build over a membership registry.
    pub fn new(membership: Arc<MembershipRegistry>) -> Self {
        Self { membership }
    }
}

impl PlacementPolicy for ConsistentHashPlacement {
    fn select_silo(
        &self,
        actor_type: &str,
        actor_id: &str,
        available: &[SiloId],
    ) -> Option<SiloId> {
        if available.is_empty() {
            return None;
        }
        let key = ActorKey::new(actor_type, actor_id);
        if let Some(owner) = self.membership.owner_of(&key) {
            if available.contains(&owner) {
                return Some(owner);
            }
        }
        let hash = ring_hash_str(&key.ring_key());
        Some(available[hash as usize % available.len()].clone())
    }
}

/// Prefer the local silo when it is available, else consistent hashing.
///
/// Suited to cache-like actors where affinity to the caller beats
/// cluster-wide balance.
pub struct LocalPreferredPlacement {
    local: SiloId,
    fallback: ConsistentHashPlacement,
}

impl LocalPreferredPlacement {
    /// Build for a local silo, delegating misses to consistent hashing.
    pub fn new(local: SiloId, membership: Arc<MembershipRegistry>) -> Self {
        Self {
            local,
            fallback: ConsistentHashPlacement::new(membership),
        }
    }
}

impl PlacementPolicy for LocalPreferredPlacement {
    fn select_silo(
        &self,
        actor_type: &str,
        actor_id: &str,
        available: &[SiloId],
    ) -> Option<SiloId> {
        if available.contains(&self.local) {
            return Some(self.local.clone());
        }
        self.fallback.select_silo(actor_type, actor_id, available)
    }
}

/// Uniform random pick over the available members.
///
/// For stateless worker types where any member will do and no affinity is
/// wanted.
#[derive(Default)]
pub struct RandomPlacement;

impl RandomPlacement {
    /// Create the policy.
    pub fn new() -> Self {
        Self
    }
}

impl PlacementPolicy for RandomPlacement {
    fn select_silo(
        &self,
        _actor_type: &str,
        _actor_id: &str,
        available: &[SiloId],
    ) -> Option<SiloId> {
        if available.is_empty() {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..available.len());
        Some(available[idx].clone())
    }
}

/// Round-robin over the available members.
///
/// The cursor is process-wide per policy instance; with a stable member
/// list the picks cycle evenly.
#[derive(Default)]
pub struct RoundRobinPlacement {
    cursor: AtomicUsize,
}

impl RoundRobinPlacement {
    /// Create the policy with the cursor at zero.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlacementPolicy for RoundRobinPlacement {
    fn select_silo(
        &self,
        _actor_type: &str,
        _actor_id: &str,
        available: &[SiloId],
    ) -> Option<SiloId> {
        if available.is_empty() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % available.len();
        Some(available[idx].clone())
    }
}

/// Geo-aware placement through the hierarchical ring.
pub struct GeoPlacement {
    membership: Arc<MembershipRegistry>,
    preferences: GeoPreferences,
}

impl GeoPlacement {
    /// Build with the preferences every lookup should carry.
    pub fn new(membership: Arc<MembershipRegistry>, preferences: GeoPreferences) -> Self {
        Self {
            membership,
            preferences,
        }
    }
}

impl PlacementPolicy for GeoPlacement {
    fn select_silo(
        &self,
        actor_type: &str,
        actor_id: &str,
        available: &[SiloId],
    ) -> Option<SiloId> {
        let key = ActorKey::new(actor_type, actor_id);
        let silo = self
            .membership
            .geo()
            .lookup(&key.ring_key(), &self.preferences)?;
        if available.contains(&silo) {
            Some(silo)
        } else {
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::membership::SiloMeta;

    fn membership(silos: &[&str]) -> Arc<MembershipRegistry> {
        let reg = Arc::new(MembershipRegistry::new(SiloId::new(silos[0])));
        for s in silos {
            reg.register(SiloMeta::new(SiloId::new(*s), format!("{s}:7400")));
        }
        reg
    }

    fn ids(silos: &[&str]) -> Vec<SiloId> {
        silos.iter().map(|s| SiloId::new(*s)).collect()
    }

    #[test]
    fn test_consistent_hash_is_stable() {
        let policy = ConsistentHashPlacement::new(membership(&["s1", "s2", "s3"]));
        let available = ids(&["s1", "s2", "s3"]);

        let first = policy.select_silo("Order", "order-42", &available).unwrap();
        for _ in 0..10 {
            assert_eq!(
                policy.select_silo("Order", "order-42", &available).unwrap(),
                first
            );
        }
    }

    #[test]
    fn test_consistent_hash_empty_availability() {
        let policy = ConsistentHashPlacement::new(membership(&["s1"]));
        assert!(policy.select_silo("Order", "o1", &[]).is_none());
    }

    #[test]
    fn test_consistent_hash_degrades_within_available() {
        let policy = ConsistentHashPlacement::new(membership(&["s1", "s2", "s3"]));
        // Caller only sees s1: whatever the ring says, the pick must be s1.
        let available = ids(&["s1"]);

        for i in 0..50 {
            assert_eq!(
                policy.select_silo("Order", &format!("o{i}"), &available),
                Some(SiloId::new("s1"))
            );
        }
    }

    #[test]
    fn test_local_preferred_picks_local() {
        let policy =
            LocalPreferredPlacement::new(SiloId::new("s2"), membership(&["s1", "s2", "s3"]));
        let available = ids(&["s1", "s2", "s3"]);

        assert_eq!(
            policy.select_silo("Order", "o1", &available),
            Some(SiloId::new("s2"))
        );
    }

    #[test]
    fn test_local_preferred_falls_back_when_local_absent() {
        let policy =
            LocalPreferredPlacement::new(SiloId::new("gone"), membership(&["s1", "s2", "s3"]));
        let available = ids(&["s1", "s2", "s3"]);

        let silo = policy.select_silo("Order", "o1", &available).unwrap();
        assert!(available.contains(&silo));
    }

    #[test]
    fn test_random_stays_within_available() {
        let policy = RandomPlacement::new();
        let available = ids(&["s1", "s2"]);

        for _ in 0..100 {
            let silo = policy.select_silo("Worker", "w", &available).unwrap();
            assert!(available.contains(&silo));
        }
        assert!(policy.select_silo("Worker", "w", &[]).is_none());
    }

    #[test]
    fn test_round_robin_cycles() {
        let policy = RoundRobinPlacement::new();
        let available = ids(&["s1", "s2", "s3"]);

        let picks: Vec<SiloId> = (0..6)
            .map(|_| policy.select_silo("Worker", "w", &available).unwrap())
            .collect();

        assert_eq!(picks[0], picks[3]);
        assert_eq!(picks[1], picks[4]);
        assert_eq!(picks[2], picks[5]);
        assert_ne!(picks[0], picks[1]);
    }

    #[test]
    fn test_geo_placement_respects_region() {
        let reg = Arc::new(MembershipRegistry::new(SiloId::new("eu-1")));
        reg.register(SiloMeta::new(SiloId::new("eu-1"), "a").with_location("eu", "eu-a"));
        reg.register(SiloMeta::new(SiloId::new("us-1"), "b").with_location("us", "us-a"));

        let policy = GeoPlacement::new(
            Arc::clone(&reg),
            GeoPreferences {
                region: Some("eu".to_string()),
                ..Default::default()
            },
        );
        let available = ids(&["eu-1", "us-1"]);

        for i in 0..20 {
            assert_eq!(
                policy.select_silo("Order", &format!("o{i}"), &available),
                Some(SiloId::new("eu-1"))
            );
        }
    }
}
