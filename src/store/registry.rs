//! Store definitions lookup
//!
//! Provides a trait for store lookup that can be implemented by different
//! backends. The in-memory registry is seeded from configuration.

use crate::error::{DepotError, DepotResult};
use crate::store::artifact::ArtifactStore;
use crate::store::key::StoreKey;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Abstract store definition lookup
pub trait StoreRegistry: Send + Sync {
    /// Look up a store by key
    fn get(&self, key: &StoreKey) -> Option<ArtifactStore>;

    /// Insert or replace a store definition
    fn put(&self, store: ArtifactStore);

    /// Remove a store definition, returning whether it existed
    fn remove(&self, key: &StoreKey) -> bool;

    /// All store definitions, sorted by key
    fn all(&self) -> Vec<ArtifactStore>;

    /// Check if a store exists
    fn contains(&self, key: &StoreKey) -> bool {
        self.get(key).is_some()
    }

    /// Look up a store, failing with [`DepotError::StoreNotFound`]
    fn require(&self, key: &StoreKey) -> DepotResult<ArtifactStore> {
        self.get(key)
            .ok_or_else(|| DepotError::StoreNotFound(key.clone()))
    }
}

/// Registry held entirely in memory
#[derive(Default)]
pub struct MemoryStoreRegistry {
    stores: RwLock<HashMap<StoreKey, ArtifactStore>>,
}

impl MemoryStoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from a list of definitions.
    ///
    /// Fails on duplicate keys so configuration mistakes surface early.
    pub fn from_stores(stores: impl IntoIterator<Item = ArtifactStore>) -> DepotResult<Self> {
        let mut map = HashMap::new();
        for store in stores {
            if map.contains_key(&store.key) {
                return Err(DepotError::StoreExists(store.key));
            }
            map.insert(store.key.clone(), store);
        }
        debug!("Loaded {} store definition(s)", map.len());
        Ok(Self {
            stores: RwLock::new(map),
        })
    }
}

impl StoreRegistry for MemoryStoreRegistry {
    fn get(&self, key: &StoreKey) -> Option<ArtifactStore> {
        let stores = self.stores.read().unwrap_or_else(|e| e.into_inner());
        stores.get(key).cloned()
    }

    fn put(&self, store: ArtifactStore) {
        let mut stores = self.stores.write().unwrap_or_else(|e| e.into_inner());
        stores.insert(store.key.clone(), store);
    }

    fn remove(&self, key: &StoreKey) -> bool {
        let mut stores = self.stores.write().unwrap_or_else(|e| e.into_inner());
        stores.remove(key).is_some()
    }

    fn all(&self) -> Vec<ArtifactStore> {
        let stores = self.stores.read().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<ArtifactStore> = stores.values().cloned().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }
}
