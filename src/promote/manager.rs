//! Path promotion between stores

use crate::content::ContentStorage;
use crate::error::{DepotError, DepotResult};
use crate::promote::model::{PromoteRequest, PromoteResult};
use crate::store::StoreRegistry;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Copies or moves content from a source store to a target store.
///
/// The manager keeps no state between calls: resume and rollback take the
/// previous [`PromoteResult`]. Paths within one call are processed
/// sequentially, but nothing serializes separate calls. Two promotions that
/// write the same target paths concurrently race in storage and the last
/// write wins; callers that need isolation must provide it themselves.
pub struct PromotionManager {
    pub(super) registry: Arc<dyn StoreRegistry>,
    storage: Arc<dyn ContentStorage>,
}

impl PromotionManager {
    pub fn new(registry: Arc<dyn StoreRegistry>, storage: Arc<dyn ContentStorage>) -> Self {
        Self { registry, storage }
    }

    /// Promote the requested paths (or everything in the source).
    ///
    /// Unknown source or target stores, or a source equal to the target,
    /// fail the whole call. Content errors
    /// stop processing at the failing path and are reported in the result,
    /// with that path and everything after it left pending.
    pub async fn promote(&self, request: PromoteRequest) -> DepotResult<PromoteResult> {
        self.check_stores(&request)?;

        let mut result = PromoteResult::new(request);

        let candidates = match self.candidate_paths(&result.request).await {
            Ok(candidates) => candidates,
            Err(e) => {
                result.error = Some(format!("Failed to list content in {}: {}", result.request.source, e));
                return Ok(result);
            }
        };
        result.pending_paths.extend(candidates.iter().cloned());

        if result.request.dry_run {
            info!(
                "Dry run: {} path(s) would be promoted from {} to {}",
                result.pending_paths.len(),
                result.request.source,
                result.request.target
            );
            return Ok(result);
        }

        self.run_paths(&mut result, candidates).await;
        Ok(result)
    }

    /// Continue a failed promotion with its pending paths.
    ///
    /// Completed paths are kept as they are and never processed again, even
    /// when a hand-edited result also lists them as pending.
    pub async fn resume(&self, mut result: PromoteResult) -> DepotResult<PromoteResult> {
        self.check_stores(&result.request)?;

        if result.request.dry_run {
            debug!("Nothing to resume for a dry run");
            return Ok(result);
        }

        result.error = None;
        let completed = &result.completed_paths;
        result.pending_paths.retain(|path| !completed.contains(path));
        let pending: Vec<String> = result.pending_paths.iter().cloned().collect();
        self.run_paths(&mut result, pending).await;
        Ok(result)
    }

    /// Undo the completed paths of a promotion.
    ///
    /// Each path is removed from the target (after restoring it to the source
    /// for purging promotions) and moved back to pending. Failures are
    /// collected in the result and do not stop the remaining paths. A path
    /// whose target copy is already gone stays completed.
    pub async fn rollback(&self, mut result: PromoteResult) -> DepotResult<PromoteResult> {
        self.check_stores(&result.request)?;

        let mut errors = Vec::new();
        let completed: Vec<String> = result.completed_paths.iter().cloned().collect();

        for path in completed {
            match self.rollback_path(&result.request, &path).await {
                Ok(true) => result.revert(&path),
                Ok(false) => debug!("{} is no longer in {}, leaving it completed", path, result.request.target),
                Err(e) => {
                    warn!("Failed to roll back {}: {}", path, e);
                    errors.push(format!("Failed to roll back {}: {}", path, e));
                }
            }
        }

        result.error = if errors.is_empty() {
            None
        } else {
            Some(errors.join("\n"))
        };

        info!(
            "Rolled back promotion {} -> {}: {} path(s) reverted, {} failure(s)",
            result.request.source,
            result.request.target,
            result.pending_paths.len(),
            errors.len()
        );
        Ok(result)
    }

    /// Both stores must exist and differ. Promoting a store into itself with
    /// a purge would delete the only copy of every path.
    fn check_stores(&self, request: &PromoteRequest) -> DepotResult<()> {
        self.registry.require(&request.source)?;
        self.registry.require(&request.target)?;
        if request.source == request.target {
            return Err(DepotError::SameStorePromotion(request.source.clone()));
        }
        Ok(())
    }

    /// Paths to promote, in listing order. Explicit paths missing at the
    /// source are dropped.
    async fn candidate_paths(&self, request: &PromoteRequest) -> DepotResult<Vec<String>> {
        let Some(explicit) = request.explicit_paths() else {
            let listing = self.storage.list_recursively(&request.source, "").await?;
            return Ok(listing.into_iter().map(|t| t.path().to_string()).collect());
        };

        let mut found = Vec::with_capacity(explicit.len());
        for path in explicit {
            let transfer = self.storage.storage_reference(&request.source, path).await?;
            if transfer.exists() {
                found.push(transfer.path().to_string());
            } else {
                warn!("{} does not exist in {}, skipping", path, request.source);
            }
        }
        Ok(found)
    }

    async fn run_paths(&self, result: &mut PromoteResult, paths: Vec<String>) {
        for path in paths {
            match self.promote_path(&result.request, &path).await {
                Ok(true) => {
                    debug!("Promoted {} from {} to {}", path, result.request.source, result.request.target);
                    result.complete(&path);
                }
                Ok(false) => {
                    warn!("{} disappeared from {}, dropping it", path, result.request.source);
                    result.pending_paths.remove(&path);
                }
                Err(e) => {
                    warn!("Promotion of {} failed: {}", path, e);
                    result.error = Some(format!("Failed to promote {}: {}", path, e));
                    return;
                }
            }
        }

        info!(
            "Promoted {} path(s) from {} to {}",
            result.completed_paths.len(),
            result.request.source,
            result.request.target
        );
    }

    /// Copy one path; `Ok(false)` means the source no longer has it
    async fn promote_path(&self, request: &PromoteRequest, path: &str) -> DepotResult<bool> {
        let transfer = self.storage.storage_reference(&request.source, path).await?;
        if !transfer.exists() {
            return Ok(false);
        }

        let stream = self.storage.open(&transfer).await?;
        self.storage.store(&request.target, transfer.path(), stream).await?;

        if request.purge_source {
            self.storage.delete(&request.source, transfer.path()).await?;
        }
        Ok(true)
    }

    /// Revert one path; `Ok(false)` means the target no longer has it
    async fn rollback_path(&self, request: &PromoteRequest, path: &str) -> DepotResult<bool> {
        let transfer = self.storage.storage_reference(&request.target, path).await?;
        if !transfer.exists() {
            return Ok(false);
        }

        if request.purge_source {
            let stream = self.storage.open(&transfer).await?;
            self.storage.store(&request.source, transfer.path(), stream).await?;
        }

        self.storage.delete(&request.target, transfer.path()).await?;
        Ok(true)
    }
}
