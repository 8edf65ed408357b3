//! Routing data instances.
//!
//! An instance is a named, loaded set of road segments. The pipeline reaches
//! instances only through the [`InstanceRegistry`] trait; how instances are
//! loaded and retired is up to the registry implementation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! └────────────────────┬────────────────────┘
//!                      │ try_get(name)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │      InstanceRegistry (trait)           │
//! │   InstanceManager: in-memory map        │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │   DataInstance  ── RwLock<SegmentStore> │
//! │   (bucket index at zoom 14)             │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use roadtile_server::instance::{DataInstance, InstanceManager, SegmentStore};
//!
//! let manager = InstanceManager::new();
//! manager.register(DataInstance::new("mytown", SegmentStore::new())).await;
//!
//! let instance = manager.try_get("mytown").await.unwrap();
//! let store = instance.read().await;
//! let segments = store.query(&tile);
//! ```

mod loader;
mod registry;
mod store;

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use loader::{load_instance_file, load_instances, store_from_geojson};
pub use registry::{InstanceManager, InstanceRegistry};
pub use store::{
    Coordinate, Segment, SegmentSet, SegmentStore, Tags, INDEX_ZOOM, NEIGHBORHOOD_BUFFER,
};

/// A named routing dataset shared by all requests against it.
///
/// The segment store sits behind a read-write lock: any number of readers may
/// resolve and encode tiles at once, while writers get exclusive access.
pub struct DataInstance {
    name: String,
    store: RwLock<SegmentStore>,
    active: AtomicBool,
}

impl DataInstance {
    /// Create an active instance owning `store`.
    pub fn new(name: impl Into<String>, store: SegmentStore) -> Self {
        Self {
            name: name.into(),
            store: RwLock::new(store),
            active: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the instance currently accepts requests.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    /// Shared access to the store.
    pub async fn read(&self) -> RwLockReadGuard<'_, SegmentStore> {
        self.store.read().await
    }

    /// Exclusive access to the store.
    pub async fn write(&self) -> RwLockWriteGuard<'_, SegmentStore> {
        self.store.write().await
    }

    /// Swap in a new store, returning the previous one.
    pub async fn replace_store(&self, store: SegmentStore) -> SegmentStore {
        let mut guard = self.store.write().await;
        std::mem::replace(&mut *guard, store)
    }

    /// Number of segments currently stored.
    pub async fn segment_count(&self) -> usize {
        self.store.read().await.len()
    }
}

impl std::fmt::Debug for DataInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataInstance")
            .field("name", &self.name)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}
