// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;

// Layer 3: Internal module imports
use super::traits::ActorInstance;
use crate::dispatch::RegistryError;

/// Creates a fresh instance for an actor id of the registered type.
pub type ActorFactory = Arc<dyn Fn(&str) -> Box<dyn ActorInstance> + Send + Sync>;

/// Process-wide `actor type name → factory` table.
///
/// The mapping is bijective by name: registering the same name twice
/// fails, and after [`ActorFactoryRegistry::freeze`] every write fails
/// loudly, since a frozen registry changing underfoot would break the
/// at-most-one-activation invariant.
#[derive(Default)]
pub struct ActorFactoryRegistry {
    factories: DashMap<String, ActorFactory>,
    frozen: AtomicBool,
}

impl ActorFactoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a type name.
    pub fn register(
        &self,
        actor_type: impl Into<String>,
        factory: ActorFactory,
    ) -> Result<(), RegistryError> {
        if self.frozen.load(Ordering::Acquire) {
            return Err(RegistryError::Frozen);
        }
        let actor_type = actor_type.into();
        match self.factories.entry(actor_type.clone()) {
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(factory);
                Ok(())
            }
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(RegistryError::Duplicate(actor_type))
            }
        }
    }

    /// Instantiate an actor of the type for the given id.
    pub fn create(&self, actor_type: &str, actor_id: &str) -> Option<Box<dyn ActorInstance>> {
        let factory = self.factories.get(actor_type)?;
        Some((factory.value())(actor_id))
    }

    /// Whether the type is registered.
    pub fn contains(&self, actor_type: &str) -> bool {
        self.factories.contains_key(actor_type)
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
        self.factories.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::any::Any;

    struct Probe {
        id: String,
    }

    impl ActorInstance for Probe {
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn probe_factory() -> ActorFactory {
        Arc::new(|actor_id: &str| {
            Box::new(Probe {
                id: actor_id.to_string(),
            }) as Box<dyn ActorInstance>
        })
    }

    #[test]
    fn test_register_and_create() {
        let registry = ActorFactoryRegistry::new();
        registry.register("Order", probe_factory()).unwrap();

        let mut instance = registry.create("Order", "o1").unwrap();
        let probe = instance.as_any_mut().downcast_mut::<Probe>().unwrap();
        assert_eq!(probe.id, "o1");
    }

    #[test]
    fn test_unknown_type_returns_none() {
        let registry = ActorFactoryRegistry::new();
        assert!(registry.create("Cart", "c1").is_none());
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = ActorFactoryRegistry::new();
        registry.register("Order", probe_factory()).unwrap();

        assert_eq!(
            registry.register("Order", probe_factory()).unwrap_err(),
            RegistryError::Duplicate("Order".to_string())
        );
    }

    #[test]
    fn test_freeze_rejects_late_registration() {
        let registry = ActorFactoryRegistry::new();
        registry.register("Order", probe_factory()).unwrap();
        registry.freeze();

        assert_eq!(
            registry.register("Cart", probe_factory()).unwrap_err(),
            RegistryError::Frozen
        );
        // Existing entries keep working.
        assert!(registry.create("Order", "o1").is_some());
    }
}
