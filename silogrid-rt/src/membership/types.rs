// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::util::SiloId;

/// Lifecycle status of a cluster member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiloStatus {
    /// Accepting placements and traffic.
    Active,

    /// Finishing existing work; excluded from new placements.
    Draining,

    /// Confirmed gone; kept briefly for diagnostics.
    Dead,
}

/// Directory entry for one silo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiloMeta {
    /// Stable member id (also seeds the ring's virtual-node keys).
    pub id: SiloId,

    /// `host:port` the transport dials.
    pub endpoint: String,

    /// Optional region for geo placement.
    pub region: Option<String>,

    /// Optional zone within the region.
    pub zone: Option<String>,

    /// Optional shard group membership.
    pub shard_group: Option<String>,

    /// Runtime version advertised by the member, for version-aware routing.
    pub version: String,

    /// Current lifecycle status.
    pub status: SiloStatus,

    /// When the member joined the directory.
    pub joined_at: DateTime<Utc>,
}

impl SiloMeta {
    /// Directory entry for an active member with no geo placement.
    pub fn new(id: SiloId, endpoint: impl Into<String>) -> Self {
        Self {
            id,
            endpoint: endpoint.into(),
            region: None,
            zone: None,
            shard_group: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: SiloStatus::Active,
            joined_at: Utc::now(),
        }
    }

    /// Builder method: place the silo in a region/zone.
    pub fn with_location(mut self, region: impl Into<String>, zone: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self.zone = Some(zone.into());
        self
    }

    /// Builder method: join a shard group.
    pub fn with_shard_group(mut self, group: impl Into<String>) -> Self {
        self.shard_group = Some(group.into());
        self
    }

    /// Builder method: advertise an explicit runtime version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Whether this member participates in placement.
    pub fn is_active(&self) -> bool {
        self.status == SiloStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_silo_is_active() {
        let meta = SiloMeta::new(SiloId::new("s1"), "127.0.0.1:7410");

        assert!(meta.is_active());
        assert_eq!(meta.endpoint, "127.0.0.1:7410");
        assert!(meta.region.is_none());
    }

    #[test]
    fn test_builders() {
        let meta = SiloMeta::new(SiloId::new("s1"), "127.0.0.1:7410")
            .with_location("eu", "eu-a")
            .with_shard_group("payments")
            .with_version("2.1.0");

        assert_eq!(meta.region.as_deref(), Some("eu"));
        assert_eq!(meta.zone.as_deref(), Some("eu-a"));
        assert_eq!(meta.shard_group.as_deref(), Some("payments"));
        assert_eq!(meta.version, "2.1.0");
    }

    #[test]
    fn test_non_active_statuses() {
        let mut meta = SiloMeta::new(SiloId::new("s1"), "addr");
        meta.status = SiloStatus::Draining;
        assert!(!meta.is_active());
        meta.status = SiloStatus::Dead;
        assert!(!meta.is_active());
    }
}
