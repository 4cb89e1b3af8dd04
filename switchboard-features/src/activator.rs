//! Strategy activation.
//!
//! The engine never names strategy types. It asks a [`ToggleActivator`] for an
//! instance by the toggle's type name; [`ToggleRegistry`] answers from a table
//! of factories filled at startup by built-in and third-party strategies.

use crate::toggle::{ToggleDescriptor, ToggleStrategy, ToggleType};
use crate::toggles::{EnvironmentVariableToggle, FromToToggle, OffToggle, OnToggle};
use dashmap::DashMap;
use std::sync::Arc;
use switchboard_log::debug;

/// Builds a strategy instance.
pub type ToggleFactory = Arc<dyn Fn() -> Arc<dyn ToggleStrategy> + Send + Sync>;

/// Resolves strategy instances from type names.
pub trait ToggleActivator: Send + Sync {
    /// Instance for `type_name`, or `None` when the type is unknown.
    ///
    /// An unknown type is an expected outcome, never an error.
    fn create_instance(&self, type_name: &str) -> Option<Arc<dyn ToggleStrategy>>;
}

impl<A: ToggleActivator + ?Sized> ToggleActivator for Arc<A> {
    fn create_instance(&self, type_name: &str) -> Option<Arc<dyn ToggleStrategy>> {
        (**self).create_instance(type_name)
    }
}

#[derive(Clone)]
struct Registration {
    factory: ToggleFactory,
    descriptor: Option<ToggleDescriptor>,
}

/// Concurrent table of `type name → factory`.
///
/// Registering a type name twice replaces the earlier registration.
///
/// # Examples
///
/// ```
/// use switchboard_features::{FromToToggle, OnToggle, ToggleActivator, ToggleRegistry};
///
/// let registry = ToggleRegistry::new();
/// registry.register::<OnToggle>();
/// registry.register::<FromToToggle>();
///
/// assert!(registry.create_instance("on").is_some());
/// assert!(registry.create_instance("geo_ip").is_none());
/// ```
#[derive(Default)]
pub struct ToggleRegistry {
    entries: DashMap<String, Registration>,
}

impl ToggleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in strategies:
    /// `on`, `off`, `from_to` and `environment_variable`.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register::<OnToggle>();
        registry.register::<OffToggle>();
        registry.register::<FromToToggle>();
        registry.register::<EnvironmentVariableToggle>();
        registry
    }

    /// Register a strategy type; each activation builds a fresh `T::default()`.
    pub fn register<T: ToggleType + Default>(&self) {
        self.insert(
            T::TYPE_NAME,
            Arc::new(|| Arc::new(T::default()) as Arc<dyn ToggleStrategy>),
            Some(T::descriptor()),
        );
    }

    /// Register one shared, reentrant instance of a strategy type.
    pub fn register_shared<T: ToggleType>(&self, instance: T) {
        let shared: Arc<dyn ToggleStrategy> = Arc::new(instance);
        self.insert(
            T::TYPE_NAME,
            Arc::new(move || Arc::clone(&shared)),
            Some(T::descriptor()),
        );
    }

    /// Register an arbitrary factory under `type_name`.
    pub fn register_factory<F>(&self, type_name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn ToggleStrategy> + Send + Sync + 'static,
    {
        self.insert(type_name, Arc::new(factory), None);
    }

    fn insert(
        &self,
        type_name: impl Into<String>,
        factory: ToggleFactory,
        descriptor: Option<ToggleDescriptor>,
    ) {
        let type_name = type_name.into();
        debug!("toggle" = type_name; "Registered toggle type");
        self.entries.insert(type_name, Registration { factory, descriptor });
    }

    /// Remove a registration, returning whether it existed.
    pub fn unregister(&self, type_name: &str) -> bool {
        self.entries.remove(type_name).is_some()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Descriptors of registered types that publish one, sorted by type name.
    pub fn descriptors(&self) -> Vec<ToggleDescriptor> {
        let mut descriptors: Vec<ToggleDescriptor> = self
            .entries
            .iter()
            .filter_map(|e| e.value().descriptor.clone())
            .collect();
        descriptors.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        descriptors
    }
}

impl ToggleActivator for ToggleRegistry {
    fn create_instance(&self, type_name: &str) -> Option<Arc<dyn ToggleStrategy>> {
        // release the shard guard before running user code
        let factory = match self.entries.get(type_name) {
            Some(entry) => Arc::clone(&entry.factory),
            None => {
                debug!("toggle" = type_name; "Toggle type is not registered");
                return None;
            }
        };
        Some(factory())
    }
}

impl std::fmt::Debug for ToggleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToggleRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}
