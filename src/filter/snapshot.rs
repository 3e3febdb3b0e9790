//! Release / snapshot policy for hosted stores

use crate::filter::{retain, RepositoryFilter};
use crate::store::{ArtifactStore, StoreKey, StoreKind};
use std::borrow::Cow;

const SNAPSHOT_MARKER: &str = "-SNAPSHOT";

/// Drops hosted stores whose release/snapshot policy rejects the path
pub struct SnapshotPolicyFilter;

impl SnapshotPolicyFilter {
    pub const PRIORITY: i32 = 90;
}

pub fn is_snapshot_path(path: &str) -> bool {
    path.contains(SNAPSHOT_MARKER)
}

fn accepts(store: &ArtifactStore, snapshot: bool) -> bool {
    match store.kind {
        StoreKind::Hosted {
            allow_releases,
            allow_snapshots,
        } => {
            if snapshot {
                allow_snapshots
            } else {
                allow_releases
            }
        }
        _ => true,
    }
}

impl RepositoryFilter for SnapshotPolicyFilter {
    fn name(&self) -> &str {
        "snapshot-policy"
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }

    fn can_process(&self, _path: &str, _group: &StoreKey) -> bool {
        true
    }

    fn filter<'a>(&self, path: &str, _group: &StoreKey, candidates: &'a [ArtifactStore]) -> Cow<'a, [ArtifactStore]> {
        let snapshot = is_snapshot_path(path);
        retain(candidates, |store| accepts(store, snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stores() -> Vec<ArtifactStore> {
        let mut releases = ArtifactStore::hosted("maven", "releases").unwrap();
        releases.kind = StoreKind::Hosted {
            allow_releases: true,
            allow_snapshots: false,
        };
        let mut snapshots = ArtifactStore::hosted("maven", "snapshots").unwrap();
        snapshots.kind = StoreKind::Hosted {
            allow_releases: false,
            allow_snapshots: true,
        };
        vec![
            releases,
            snapshots,
            ArtifactStore::remote("maven", "central", "https://repo.example.org").unwrap(),
        ]
    }

    fn names(stores: &[ArtifactStore]) -> Vec<&str> {
        stores.iter().map(|s| s.key.name()).collect()
    }

    #[test]
    fn snapshot_paths_skip_release_only_stores() {
        let group = StoreKey::parse("maven:group:public").unwrap();
        let stores = stores();
        let result = SnapshotPolicyFilter.filter("org/foo/1.0-SNAPSHOT/foo-1.0-SNAPSHOT.jar", &group, &stores);
        assert_eq!(names(&result), vec!["snapshots", "central"]);
    }

    #[test]
    fn release_paths_skip_snapshot_only_stores() {
        let group = StoreKey::parse("maven:group:public").unwrap();
        let stores = stores();
        let result = SnapshotPolicyFilter.filter("org/foo/1.0/foo-1.0.jar", &group, &stores);
        assert_eq!(names(&result), vec!["releases", "central"]);
    }
}
