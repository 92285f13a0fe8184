//! Plugin-based backend registry
//!
//! The registry allows snapshot listers, state stores and notifiers to be
//! registered dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use snapmon_core::registry::BackendRegistry;
//! use snapmon_core::config::StateStoreConfig;
//!
//! let registry = BackendRegistry::new();
//! snapmon_core::registry::register_builtin(&registry);
//!
//! let store = registry.create_state_store(&StateStoreConfig::Memory).await?;
//! ```
//!
//! ## Registration
//!
//! Backend crates register themselves during initialization:
//!
//! ```rust,ignore
//! // In the snapmon-webhook crate
//! pub fn register(registry: &BackendRegistry) {
//!     registry.register_notifier("webhook", Arc::new(WebhookNotifierFactory));
//! }
//! ```

use crate::config::{NotifierConfig, StateStoreConfig};
use crate::error::{Error, Result};
use crate::log_notifier::LogNotifierFactory;
use crate::state::{FileStateStoreFactory, MemoryStateStoreFactory};
use crate::traits::{Notifier, NotifierFactory, SnapshotListerFactory, StateStore, StateStoreFactory};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Backend registry for plugin-based collaborator creation
///
/// The registry maintains maps of backend type names to factory objects,
/// allowing dynamic instantiation of collaborators based on configuration.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes. Factories are cloned out of the map before
/// any async call, so no lock is held across an await.
#[derive(Default)]
pub struct BackendRegistry {
    /// Registered snapshot lister factories
    listers: RwLock<HashMap<String, Arc<dyn SnapshotListerFactory>>>,

    /// Registered state store factories
    state_stores: RwLock<HashMap<String, Arc<dyn StateStoreFactory>>>,

    /// Registered notifier factories
    notifiers: RwLock<HashMap<String, Arc<dyn NotifierFactory>>>,
}

impl BackendRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a snapshot lister factory
    ///
    /// # Parameters
    ///
    /// - `name`: Lister type name (e.g., "rds")
    /// - `factory`: Factory creating one lister per region
    pub fn register_lister(&self, name: impl Into<String>, factory: Arc<dyn SnapshotListerFactory>) {
        let mut listers = self.listers.write().unwrap_or_else(PoisonError::into_inner);
        listers.insert(name.into(), factory);
    }

    /// Register a state store factory
    ///
    /// # Parameters
    ///
    /// - `name`: State store type name (e.g., "dynamodb", "file", "memory")
    /// - `factory`: Factory object for creating state store instances
    pub fn register_state_store(&self, name: impl Into<String>, factory: Arc<dyn StateStoreFactory>) {
        let mut stores = self.state_stores.write().unwrap_or_else(PoisonError::into_inner);
        stores.insert(name.into(), factory);
    }

    /// Register a notifier factory
    ///
    /// # Parameters
    ///
    /// - `name`: Notifier type name (e.g., "sns", "webhook", "log")
    /// - `factory`: Factory object for creating notifier instances
    pub fn register_notifier(&self, name: impl Into<String>, factory: Arc<dyn NotifierFactory>) {
        let mut notifiers = self.notifiers.write().unwrap_or_else(PoisonError::into_inner);
        notifiers.insert(name.into(), factory);
    }

    /// Look up a snapshot lister factory by name
    ///
    /// # Returns
    ///
    /// - `Ok(factory)`: Registered factory
    /// - `Err(Error::Config)`: If no lister with that name is registered
    pub fn lister(&self, name: &str) -> Result<Arc<dyn SnapshotListerFactory>> {
        let listers = self.listers.read().unwrap_or_else(PoisonError::into_inner);
        listers
            .get(name)
            .cloned()
            .ok_or_else(|| Error::config(format!("Unknown snapshot lister type: {}", name)))
    }

    /// Create a state store from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn StateStore>)`: Created state store instance
    /// - `Err(Error)`: If store type is not registered or creation fails
    pub async fn create_state_store(&self, config: &StateStoreConfig) -> Result<Arc<dyn StateStore>> {
        let store_type = config.type_name();
        let factory = {
            let stores = self.state_stores.read().unwrap_or_else(PoisonError::into_inner);
            stores
                .get(store_type)
                .cloned()
                .ok_or_else(|| Error::config(format!("Unknown state store type: {}", store_type)))?
        };

        factory.create(config).await
    }

    /// Create a notifier from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn Notifier>)`: Created notifier instance
    /// - `Err(Error)`: If notifier type is not registered or creation fails
    pub async fn create_notifier(&self, config: &NotifierConfig) -> Result<Arc<dyn Notifier>> {
        let notifier_type = config.type_name();
        let factory = {
            let notifiers = self.notifiers.read().unwrap_or_else(PoisonError::into_inner);
            notifiers
                .get(notifier_type)
                .cloned()
                .ok_or_else(|| Error::config(format!("Unknown notifier type: {}", notifier_type)))?
        };

        factory.create(config).await
    }

    /// List all registered lister types
    pub fn list_listers(&self) -> Vec<String> {
        let listers = self.listers.read().unwrap_or_else(PoisonError::into_inner);
        listers.keys().cloned().collect()
    }

    /// List all registered state store types
    pub fn list_state_stores(&self) -> Vec<String> {
        let stores = self.state_stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.keys().cloned().collect()
    }

    /// List all registered notifier types
    pub fn list_notifiers(&self) -> Vec<String> {
        let notifiers = self.notifiers.read().unwrap_or_else(PoisonError::into_inner);
        notifiers.keys().cloned().collect()
    }

    /// Check if a lister type is registered
    pub fn has_lister(&self, name: &str) -> bool {
        let listers = self.listers.read().unwrap_or_else(PoisonError::into_inner);
        listers.contains_key(name)
    }

    /// Check if a state store type is registered
    pub fn has_state_store(&self, name: &str) -> bool {
        let stores = self.state_stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.contains_key(name)
    }

    /// Check if a notifier type is registered
    pub fn has_notifier(&self, name: &str) -> bool {
        let notifiers = self.notifiers.read().unwrap_or_else(PoisonError::into_inner);
        notifiers.contains_key(name)
    }
}

/// Register the backends shipped with the core crate
///
/// - state stores: `memory`, `file`
/// - notifiers: `log`
pub fn register_builtin(registry: &BackendRegistry) {
    registry.register_state_store("memory", Arc::new(MemoryStateStoreFactory));
    registry.register_state_store("file", Arc::new(FileStateStoreFactory));
    registry.register_notifier("log", Arc::new(LogNotifierFactory));
}
