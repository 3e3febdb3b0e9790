//! Merged group content
//!
//! Content generated for a group from several member stores (directory
//! listings, aggregate metadata) is written as a set:
//!
//! | File | Content |
//! |------|---------|
//! | `{path}` | merged artifact |
//! | `{path}.md5` | MD5 of the merged artifact |
//! | `{path}.sha` | SHA-1 of the merged artifact |
//! | `{path}.info` | contributing store keys, one per line, in merge order |
//!
//! The set is written and deleted as a unit.

use crate::content::digest::ContentDigest;
use crate::content::storage::{ContentStorage, Transfer};
use crate::error::{DepotError, DepotResult};
use crate::store::{GroupResolver, StoreKey};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const MD5_SUFFIX: &str = ".md5";
pub const SHA_SUFFIX: &str = ".sha";
pub const MERGEINFO_SUFFIX: &str = ".info";

/// Strategy that combines member content into one artifact
pub trait ContentMerger: Send + Sync {
    /// Merge `sources` (in group order). `None` means nothing to write.
    fn merge(&self, path: &str, sources: &[(StoreKey, Vec<u8>)]) -> Option<Vec<u8>>;
}

/// Union of newline-separated listings, first occurrence wins the position
pub struct ListingMerger;

impl ContentMerger for ListingMerger {
    fn merge(&self, _path: &str, sources: &[(StoreKey, Vec<u8>)]) -> Option<Vec<u8>> {
        if sources.is_empty() {
            return None;
        }

        let mut seen = HashSet::new();
        let mut lines = Vec::new();
        for (_, bytes) in sources {
            for line in String::from_utf8_lossy(bytes).lines() {
                let line = line.trim_end();
                if !line.is_empty() && seen.insert(line.to_string()) {
                    lines.push(line.to_string());
                }
            }
        }

        let mut merged = lines.join("\n");
        merged.push('\n');
        Some(merged.into_bytes())
    }
}

/// Writes, reads and removes merged content sets
pub struct GroupMergeHelper {
    storage: Arc<dyn ContentStorage>,
    resolver: GroupResolver,
}

impl GroupMergeHelper {
    pub fn new(storage: Arc<dyn ContentStorage>, resolver: GroupResolver) -> Self {
        Self { storage, resolver }
    }

    /// Every path of the set for `path`, artifact first
    pub fn set_paths(path: &str) -> [String; 4] {
        [
            path.to_string(),
            format!("{}{}", path, MD5_SUFFIX),
            format!("{}{}", path, SHA_SUFFIX),
            format!("{}{}", path, MERGEINFO_SUFFIX),
        ]
    }

    /// Write the merged artifact and its companions.
    ///
    /// If any file of the set fails to write, whatever was written is removed
    /// again before the error is returned.
    pub async fn write_merged(
        &self,
        group: &StoreKey,
        path: &str,
        merged: &[u8],
        sources: &[StoreKey],
    ) -> DepotResult<Transfer> {
        let result = async {
            let transfer = self.storage.write_bytes(group, path, merged.to_vec()).await?;
            self.write_merge_info(group, path, merged, sources).await?;
            Ok::<_, DepotError>(transfer)
        }
        .await;

        if let Err(e) = &result {
            warn!("Failed to write merged set {} in {}: {}", path, group, e);
            if let Err(cleanup) = self.delete_checksums_and_merge_info(group, path).await {
                warn!("Failed to clean up partial merged set {} in {}: {}", path, group, cleanup);
            }
        }
        result
    }

    /// Write checksum and provenance companions for already-merged content
    pub async fn write_merge_info(
        &self,
        group: &StoreKey,
        path: &str,
        merged: &[u8],
        sources: &[StoreKey],
    ) -> DepotResult<()> {
        let md5 = ContentDigest::Md5.hex(merged);
        let sha = ContentDigest::Sha1.hex(merged);
        let info = sources
            .iter()
            .map(|key| key.to_string())
            .collect::<Vec<_>>()
            .join("\n");

        self.storage
            .write_bytes(group, &format!("{}{}", path, MD5_SUFFIX), md5.into_bytes())
            .await?;
        self.storage
            .write_bytes(group, &format!("{}{}", path, SHA_SUFFIX), sha.into_bytes())
            .await?;
        self.storage
            .write_bytes(group, &format!("{}{}", path, MERGEINFO_SUFFIX), info.into_bytes())
            .await?;

        debug!("Wrote merge info for {} in {} from {} source(s)", path, group, sources.len());
        Ok(())
    }

    /// Contributing stores recorded for `path`, if a provenance file exists
    pub async fn read_merge_info(&self, group: &StoreKey, path: &str) -> DepotResult<Option<Vec<StoreKey>>> {
        let transfer = self
            .storage
            .storage_reference(group, &format!("{}{}", path, MERGEINFO_SUFFIX))
            .await?;
        if !transfer.exists() {
            return Ok(None);
        }

        let bytes = self.storage.read_bytes(&transfer).await?;
        let keys = String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(StoreKey::parse)
            .collect::<DepotResult<Vec<_>>>()?;
        Ok(Some(keys))
    }

    /// Remove the merged artifact and all of its companions.
    ///
    /// Every file is attempted. Absent files are logged and skipped; the
    /// first real failure is returned once all deletions have been tried.
    pub async fn delete_checksums_and_merge_info(&self, group: &StoreKey, path: &str) -> DepotResult<()> {
        let mut first_error = None;

        for file in Self::set_paths(path) {
            match self.storage.delete(group, &file).await {
                Ok(true) => debug!("Deleted {} from {}", file, group),
                Ok(false) => debug!("{} not present in {}, nothing to delete", file, group),
                Err(e) => {
                    warn!("Failed to delete {} from {}: {}", file, group, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Regenerate the merged set for `path` from the group's enabled members.
    ///
    /// Returns `None` when no member has content to merge; any previous set is
    /// removed either way.
    pub async fn merge_from_members(
        &self,
        group: &StoreKey,
        path: &str,
        merger: &dyn ContentMerger,
    ) -> DepotResult<Option<Transfer>> {
        let members = self.resolver.resolve_concrete_members(group, true)?;

        let mut sources = Vec::new();
        for member in &members {
            let transfer = self.storage.storage_reference(&member.key, path).await?;
            if !transfer.exists() {
                continue;
            }
            let bytes = self.storage.read_bytes(&transfer).await?;
            sources.push((member.key.clone(), bytes));
        }

        self.delete_checksums_and_merge_info(group, path).await?;

        let Some(merged) = merger.merge(path, &sources) else {
            debug!("Nothing to merge for {} in {}", path, group);
            return Ok(None);
        };

        let contributors: Vec<StoreKey> = sources.into_iter().map(|(key, _)| key).collect();
        let transfer = self.write_merged(group, path, &merged, &contributors).await?;
        info!(
            "Merged {} in {} from {} member(s)",
            path,
            group,
            contributors.len()
        );
        Ok(Some(transfer))
    }

    /// Drop merged sets at `path` in every group affected by a change in
    /// `changed`, so they regenerate on next request. Returns the groups
    /// whose sets were cleared.
    pub async fn clear_affected_groups(&self, changed: &StoreKey, path: &str) -> DepotResult<Vec<StoreKey>> {
        let groups = self.resolver.groups_containing(changed);
        let mut cleared = Vec::with_capacity(groups.len());

        for group in groups {
            self.delete_checksums_and_merge_info(&group.key, path).await?;
            cleared.push(group.key);
        }

        Ok(cleared)
    }
}
