//! Instance registry.
//!
//! The registry maps instance names to loaded [`DataInstance`]s. The tile
//! pipeline depends only on the [`InstanceRegistry`] trait so the lifecycle of
//! instances (loading, reloading, retiring) stays outside of it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use super::DataInstance;

// =============================================================================
// InstanceRegistry Trait
// =============================================================================

/// Lookup of routing data instances by name.
#[async_trait]
pub trait InstanceRegistry: Send + Sync {
    /// Get an active instance.
    ///
    /// Returns `None` when no instance has this name or it is inactive.
    async fn try_get(&self, name: &str) -> Option<Arc<DataInstance>>;

    /// Names of all registered instances, sorted.
    async fn names(&self) -> Vec<String>;

    /// All registered instances, active or not, sorted by name.
    async fn list(&self) -> Vec<Arc<DataInstance>>;
}

// =============================================================================
// InstanceManager
// =============================================================================

/// In-memory registry of instances.
#[derive(Default)]
pub struct InstanceManager {
    instances: RwLock<HashMap<String, Arc<DataInstance>>>,
}

impl InstanceManager {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instance under its own name.
    ///
    /// Replaces and returns any instance previously registered with that name.
    pub async fn register(&self, instance: DataInstance) -> Option<Arc<DataInstance>> {
        let name = instance.name().to_string();
        let previous = self
            .instances
            .write()
            .await
            .insert(name.clone(), Arc::new(instance));
        info!(instance = %name, replaced = previous.is_some(), "Registered instance");
        previous
    }

    /// Remove an instance.
    pub async fn unregister(&self, name: &str) -> Option<Arc<DataInstance>> {
        self.instances.write().await.remove(name)
    }

    /// Mark an instance inactive without removing it.
    ///
    /// Returns `false` if no instance has this name.
    pub async fn deactivate(&self, name: &str) -> bool {
        match self.instances.read().await.get(name) {
            Some(instance) => {
                instance.set_active(false);
                true
            }
            None => false,
        }
    }

    /// Get an instance regardless of its active flag.
    pub async fn get(&self, name: &str) -> Option<Arc<DataInstance>> {
        self.instances.read().await.get(name).cloned()
    }

    /// Number of registered instances.
    pub async fn len(&self) -> usize {
        self.instances.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.instances.read().await.is_empty()
    }
}

#[async_trait]
impl InstanceRegistry for InstanceManager {
    async fn try_get(&self, name: &str) -> Option<Arc<DataInstance>> {
        self.instances
            .read()
            .await
            .get(name)
            .filter(|instance| instance.is_active())
            .cloned()
    }

    async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.instances.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    async fn list(&self) -> Vec<Arc<DataInstance>> {
        let mut instances: Vec<Arc<DataInstance>> =
            self.instances.read().await.values().cloned().collect();
        instances.sort_by(|a, b| a.name().cmp(b.name()));
        instances
    }
}

// =============================================================================
// Tests
// =============================================================================
