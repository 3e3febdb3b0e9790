//! Pass-through tracking of content events

use crate::content::Transfer;
use crate::error::DepotResult;
use crate::tracking::cache::TrackingCache;
use crate::tracking::model::{StoreEffect, TrackingKey};
use std::sync::Arc;

/// Records retrievals and stores against a tracking key.
///
/// When the key carries a tracked store, events are attributed to that store
/// instead of the store that actually served the content.
#[derive(Clone)]
pub struct TrackingListener {
    cache: Arc<TrackingCache>,
}

impl TrackingListener {
    pub fn new(cache: Arc<TrackingCache>) -> Self {
        Self { cache }
    }

    pub async fn on_retrieve(&self, key: &TrackingKey, transfer: &Transfer) -> DepotResult<()> {
        self.record(key, transfer, StoreEffect::Download).await
    }

    pub async fn on_store(&self, key: &TrackingKey, transfer: &Transfer) -> DepotResult<()> {
        self.record(key, transfer, StoreEffect::Upload).await
    }

    async fn record(&self, key: &TrackingKey, transfer: &Transfer, effect: StoreEffect) -> DepotResult<()> {
        let store = key.tracked_store().unwrap_or(transfer.store());
        self.cache.record_artifact(key, store, transfer.path(), effect).await
    }
}
