//! Actor state persistence with optimistic concurrency.
//!
//! Providers implement [`StateStorage`]; the contract is a per-key atomic
//! compare-and-set on `(actor_id, state_name)` with a monotonically
//! increasing version. [`InMemoryStateStorage`] is the reference
//! implementation used by tests and single-process deployments.

mod error;
mod memory;
mod traits;

pub use error::StorageError;
pub use memory::InMemoryStateStorage;
pub use traits::{StateStorage, VersionedState};
