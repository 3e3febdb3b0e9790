//! Tracking reports
//!
//! Renders a tracking record as the list of content a session uploaded and
//! downloaded, with URLs and checksums for each item still in storage.

use crate::content::{ContentDigest, ContentStorage};
use crate::error::{DepotError, DepotResult};
use crate::store::{StoreKey, StoreRegistry};
use crate::tracking::cache::TrackingCache;
use crate::tracking::model::{StoreEffect, TrackedContentEntry, TrackedContentRecord, TrackingKey, TrackingReport};
use std::sync::Arc;
use tracing::debug;

const REPORT_DIGESTS: [ContentDigest; 2] = [ContentDigest::Md5, ContentDigest::Sha256];

pub struct TrackingReporter {
    cache: Arc<TrackingCache>,
    storage: Arc<dyn ContentStorage>,
    registry: Arc<dyn StoreRegistry>,
}

impl TrackingReporter {
    pub fn new(cache: Arc<TrackingCache>, storage: Arc<dyn ContentStorage>, registry: Arc<dyn StoreRegistry>) -> Self {
        Self {
            cache,
            storage,
            registry,
        }
    }

    /// Build the report for `key`, with local URLs rooted at `api_base_url`
    pub async fn render_report(&self, key: &TrackingKey, api_base_url: &str) -> DepotResult<TrackingReport> {
        let record = self
            .cache
            .get_record(key)
            .await?
            .ok_or_else(|| DepotError::TrackingRecordNotFound(key.id().to_string()))?;

        let uploads = self.entries(&record, StoreEffect::Upload, api_base_url).await?;
        let downloads = self.entries(&record, StoreEffect::Download, api_base_url).await?;

        Ok(TrackingReport {
            tracking_key: key.id().to_string(),
            uploads,
            downloads,
        })
    }

    async fn entries(
        &self,
        record: &TrackedContentRecord,
        effect: StoreEffect,
        api_base_url: &str,
    ) -> DepotResult<Vec<TrackedContentEntry>> {
        let mut entries = Vec::new();

        for (store, affected) in &record.affected_stores {
            let origin = self
                .registry
                .get(store)
                .and_then(|s| s.remote_url().map(str::to_string));

            for path in affected.paths(effect) {
                let transfer = self.storage.storage_reference(store, path).await?;
                if !transfer.exists() {
                    debug!("{} of {} no longer in storage, leaving it out", effect, transfer);
                    continue;
                }

                let digests = self.storage.digest(store, transfer.path(), &REPORT_DIGESTS).await?;
                entries.push(TrackedContentEntry {
                    store_key: store.clone(),
                    path: transfer.path().to_string(),
                    local_url: local_url(api_base_url, store, transfer.path()),
                    origin_url: origin.as_deref().map(|url| join_url(url, transfer.path())),
                    md5: digests.get(&ContentDigest::Md5).cloned().unwrap_or_default(),
                    sha256: digests.get(&ContentDigest::Sha256).cloned().unwrap_or_default(),
                });
            }
        }

        entries.sort();
        Ok(entries)
    }
}

/// `<base>/content/<pkg>/<type>/<name>/<path>`
pub fn local_url(base: &str, store: &StoreKey, path: &str) -> String {
    join_url(
        base,
        &format!(
            "content/{}/{}/{}/{}",
            store.package_type(),
            store.store_type(),
            store.name(),
            path.trim_start_matches('/')
        ),
    )
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
