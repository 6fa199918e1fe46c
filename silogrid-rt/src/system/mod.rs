//! The silo: configuration, composition and the metadata query surface.

mod config;
mod errors;
mod query;
mod silo;

pub use config::{ServerlessOptions, SiloConfig, SiloConfigBuilder};
pub use errors::SiloError;
pub use query::{ActorInfo, ActorPage, ActorQuery};
pub use silo::Silo;
