//! Region/zone/silo hierarchical hash ring for geo-aware placement.

// Layer 1: Standard library imports
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use super::hash::ring_hash_str;
use crate::util::SiloId;

/// Behavior when a preferred bucket (shard group, zone, region) is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FallbackStrategy {
    /// Fall through to the global ring.
    #[default]
    Any,

    /// Widen one level at a time: zone miss retries within the region,
    /// region miss retries globally.
    NearestRegion,

    /// Report no placement.
    Fail,
}

/// Caller preferences consulted in order: shard group, region+zone,
/// region, then the global fallback chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeoPreferences {
    /// Preferred region id.
    pub region: Option<String>,

    /// Preferred zone id within the region.
    pub zone: Option<String>,

    /// Preferred shard group.
    pub shard_group: Option<String>,

    /// Whether shard-group preferences participate at all.
    pub use_shard_groups: bool,

    /// What to do when the preferred bucket has no members.
    pub fallback: FallbackStrategy,
}

/// Where a silo sits in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiloPlacement {
    /// The member silo.
    pub silo: SiloId,

    /// Region the silo belongs to.
    pub region: String,

    /// Zone within the region.
    pub zone: String,

    /// Optional shard group membership.
    pub shard_group: Option<String>,
}

/// Published immutable topology snapshot.
#[derive(Debug, Default)]
struct GeoState {
    region_points: Vec<(u32, String)>,
    zone_points: HashMap<String, Vec<(u32, String)>>,
    silo_points: HashMap<(String, String), Vec<(u32, SiloId)>>,
    shard_members: HashMap<String, Vec<SiloId>>,
}

fn ring_points(names: impl Iterator<Item = String>, vnodes: usize) -> Vec<(u32, String)> {
    let mut points = Vec::new();
    for name in names {
        for i in 0..vnodes {
            points.push((ring_hash_str(&format!("{name}:{i}")), name.clone()));
        }
    }
    points.sort();
    points
}

fn successor<'a, T>(points: &'a [(u32, T)], hash: u32) -> Option<&'a T> {
    if points.is_empty() {
        return None;
    }
    let idx = points.partition_point(|(h, _)| *h < hash);
    let idx = if idx == points.len() { 0 } else { idx };
    Some(&points[idx].1)
}

impl GeoState {
    fn build(members: &BTreeMap<SiloId, SiloPlacement>, silo_vnodes: usize) -> Self {
        let region_vnodes = (silo_vnodes / 3).max(1);
        let zone_vnodes = (silo_vnodes / 2).max(1);

        let mut regions: BTreeMap<String, BTreeMap<String, Vec<SiloId>>> = BTreeMap::new();
        let mut shard_members: HashMap<String, Vec<SiloId>> = HashMap::new();
        for placement in members.values() {
            regions
                .entry(placement.region.clone())
                .or_default()
                .entry(placement.zone.clone())
                .or_default()
                .push(placement.silo.clone());
            if let Some(group) = &placement.shard_group {
                shard_members
                    .entry(group.clone())
                    .or_default()
                    .push(placement.silo.clone());
            }
        }
        for members in shard_members.values_mut() {
            members.sort();
        }

        let region_points = ring_points(regions.keys().cloned(), region_vnodes);
        let mut zone_points = HashMap::new();
        let mut silo_points = HashMap::new();
        for (region, zones) in &regions {
            zone_points.insert(region.clone(), ring_points(zones.keys().cloned(), zone_vnodes));
            for (zone, silos) in zones {
                let mut points = Vec::new();
                for silo in silos {
                    for i in 0..silo_vnodes {
                        points.push((
                            ring_hash_str(&format!("{}:{}", silo.as_str(), i)),
                            silo.clone(),
                        ));
                    }
                }
                points.sort();
                silo_points.insert((region.clone(), zone.clone()), points);
            }
        }

        Self {
            region_points,
            zone_points,
            silo_points,
            shard_members,
        }
    }

    fn silo_in_zone(&self, region: &str, zone: &str, hash: u32) -> Option<SiloId> {
        let points = self.silo_points.get(&(region.to_string(), zone.to_string()))?;
        successor(points, hash).cloned()
    }

    fn silo_in_region(&self, region: &str, hash: u32) -> Option<SiloId> {
        let zones = self.zone_points.get(region)?;
        let zone = successor(zones, hash)?;
        self.silo_in_zone(region, zone, hash)
    }

    fn silo_global(&self, hash: u32) -> Option<SiloId> {
        let region = successor(&self.region_points, hash)?;
        self.silo_in_region(region, hash)
    }
}

/// Three-tier consistent-hash ring: regions, zones within a region, silos
/// within a zone.
///
/// Virtual-node counts scale down the hierarchy (`silo = V`,
/// `zone = V/2`, `region = V/3`) since the upper tiers have far fewer
/// members. Mutation follows the same copy-on-write discipline as
/// [`super::HashRing`].
#[derive(Debug)]
pub struct HierarchicalRing {
    silo_vnodes: usize,
    members: Mutex<BTreeMap<SiloId, SiloPlacement>>,
    snapshot: RwLock<Arc<GeoState>>,
}

impl HierarchicalRing {
    /// Create an empty topology with the default silo virtual-node count.
    pub fn new() -> Self {
        Self::with_virtual_nodes(super::DEFAULT_VIRTUAL_NODES)
    }

    /// Create an empty topology with a custom silo virtual-node count.
    pub fn with_virtual_nodes(silo_vnodes: usize) -> Self {
        Self {
            silo_vnodes: silo_vnodes.max(1),
            members: Mutex::new(BTreeMap::new()),
            snapshot: RwLock::new(Arc::new(GeoState::default())),
        }
    }

    /// Add or update a silo's placement in the hierarchy.
    pub fn add_silo(&self, placement: SiloPlacement) {
        let mut members = self.members.lock();
        members.insert(placement.silo.clone(), placement);
        self.publish(&members);
    }

    /// Remove a silo from the hierarchy.
    pub fn remove_silo(&self, silo: &SiloId) {
        let mut members = self.members.lock();
        if members.remove(silo).is_some() {
            self.publish(&members);
        }
    }

    fn publish(&self, members: &BTreeMap<SiloId, SiloPlacement>) {
        *self.snapshot.write() = Arc::new(GeoState::build(members, self.silo_vnodes));
    }

    fn snapshot(&self) -> Arc<GeoState> {
        Arc::clone(&self.snapshot.read())
    }

    /// Number of member silos.
    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    /// Whether no silo is registered.
    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }

    /// Resolve a key to a silo honoring the caller's preferences.
    ///
    /// Preference order:
    /// 1. shard group (when `use_shard_groups`): member picked by
    ///    `hash % member-count`;
    /// 2. region + zone: direct lookup in that zone's silo ring;
    /// 3. region: zone chosen by the region's zone ring, then the silo ring;
    /// 4. global: region ring, then zone, then silo, each by ring successor.
    ///
    /// An empty preferred bucket behaves per [`FallbackStrategy`].
    pub fn lookup(&self, key: &str, prefs: &GeoPreferences) -> Option<SiloId> {
        let hash = ring_hash_str(key);
        let state = self.snapshot();

        if prefs.use_shard_groups {
            if let Some(group) = &prefs.shard_group {
                match state.shard_members.get(group) {
                    Some(members) if !members.is_empty() => {
                        return Some(members[hash as usize % members.len()].clone());
                    }
                    _ => {
                        if prefs.fallback == FallbackStrategy::Fail {
                            return None;
                        }
                        // Any/NearestRegion: continue down the preference chain.
                    }
                }
            }
        }

        if let (Some(region), Some(zone)) = (&prefs.region, &prefs.zone) {
            if let Some(silo) = state.silo_in_zone(region, zone, hash) {
                return Some(silo);
            }
            match prefs.fallback {
                FallbackStrategy::Fail => return None,
                FallbackStrategy::NearestRegion => {
                    if let Some(silo) = state.silo_in_region(region, hash) {
                        return Some(silo);
                    }
                    return state.silo_global(hash);
                }
                FallbackStrategy::Any => return state.silo_global(hash),
            }
        }

        if let Some(region) = &prefs.region {
            if let Some(silo) = state.silo_in_region(region, hash) {
                return Some(silo);
            }
            match prefs.fallback {
                FallbackStrategy::Fail => return None,
                FallbackStrategy::NearestRegion | FallbackStrategy::Any => {
                    return state.silo_global(hash)
                }
            }
        }

        state.silo_global(hash)
    }
}

impl Default for HierarchicalRing {
    fn default() -> Self {
        Self::new()
    }
}
