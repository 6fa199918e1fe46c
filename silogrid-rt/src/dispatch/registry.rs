// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;

// Layer 3: Internal module imports
use super::error::RegistryError;
use super::traits::MethodDispatcher;

/// Process-wide `actor type name → dispatcher` table.
///
/// Registration happens once at startup; [`DispatcherRegistry::freeze`]
/// then pins the table and later writes fail loudly. Lookup is lock-free.
#[derive(Default)]
pub struct DispatcherRegistry {
    dispatchers: DashMap<String, Arc<dyn MethodDispatcher>>,
    frozen: AtomicBool,
}

impl DispatcherRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dispatcher under its own `actor_type` name.
    pub fn register(&self, dispatcher: Arc<dyn MethodDispatcher>) -> Result<(), RegistryError> {
        if self.frozen.load(Ordering::Acquire) {
            return Err(RegistryError::Frozen);
        }
        let type_name = dispatcher.actor_type().to_string();
        match self.dispatchers.entry(type_name.clone()) {
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(dispatcher);
                Ok(())
            }
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(RegistryError::Duplicate(type_name))
            }
        }
    }

    /// Lock-free dispatcher lookup.
    pub fn get(&self, actor_type: &str) -> Option<Arc<dyn MethodDispatcher>> {
        self.dispatchers.get(actor_type).map(|d| Arc::clone(&d))
    }

    /// Whether a dispatcher exists for the type.
    pub fn contains(&self, actor_type: &str) -> bool {
        self.dispatchers.contains_key(actor_type)
    }

    /// Pin the table; subsequent registrations fail.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    /// Whether the table is pinned.
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Registered type count.
    pub fn len(&self) -> usize {
        self.dispatchers.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.dispatchers.is_empty()
    }
}
