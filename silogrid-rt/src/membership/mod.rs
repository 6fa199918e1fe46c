//! Silo directory and membership-driven ring maintenance.

mod registry;
mod types;

pub use registry::MembershipRegistry;
pub use types::{SiloMeta, SiloStatus};
