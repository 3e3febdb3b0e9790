//! Group membership resolution
//!
//! Groups may contain other groups, and membership may be cyclic. Resolution
//! walks the membership graph depth-first, left to right, with an explicit
//! work stack and a visited-set keyed by [`StoreKey`]:
//! - every concrete store appears exactly once, at its first position
//! - a group reached a second time is not expanded again
//! - constituents missing from the registry are skipped

use crate::error::{DepotError, DepotResult};
use crate::store::artifact::ArtifactStore;
use crate::store::key::StoreKey;
use crate::store::registry::StoreRegistry;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Resolves group membership against a store registry
#[derive(Clone)]
pub struct GroupResolver {
    registry: Arc<dyn StoreRegistry>,
}

impl GroupResolver {
    pub fn new(registry: Arc<dyn StoreRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<dyn StoreRegistry> {
        &self.registry
    }

    /// Ordered, deduplicated concrete (non-group) members of a group.
    ///
    /// With `enabled_only`, disabled concrete stores are dropped and disabled
    /// nested groups are not expanded.
    pub fn resolve_concrete_members(
        &self,
        group: &StoreKey,
        enabled_only: bool,
    ) -> DepotResult<Vec<ArtifactStore>> {
        let root = self.require_group(group)?;

        let mut visited: HashSet<StoreKey> = HashSet::new();
        visited.insert(root.key.clone());

        let mut stack: Vec<StoreKey> = root.constituents().iter().rev().cloned().collect();
        let mut resolved = Vec::new();

        while let Some(key) = stack.pop() {
            if !visited.insert(key.clone()) {
                continue;
            }

            let Some(store) = self.registry.get(&key) else {
                debug!("Skipping missing member {} of {}", key, group);
                continue;
            };

            if enabled_only && !store.enabled {
                debug!("Skipping disabled member {} of {}", key, group);
                continue;
            }

            if store.is_group() {
                stack.extend(store.constituents().iter().rev().cloned());
            } else {
                resolved.push(store);
            }
        }

        Ok(resolved)
    }

    /// Direct members of a group, in order, without expanding nested groups
    pub fn ordered_members(&self, group: &StoreKey, enabled_only: bool) -> DepotResult<Vec<ArtifactStore>> {
        let root = self.require_group(group)?;

        Ok(root
            .constituents()
            .iter()
            .filter_map(|key| self.registry.get(key))
            .filter(|store| !enabled_only || store.enabled)
            .collect())
    }

    /// Every group that contains `key`, directly or through nested groups
    pub fn groups_containing(&self, key: &StoreKey) -> Vec<ArtifactStore> {
        self.registry
            .all()
            .into_iter()
            .filter(|store| store.is_group() && self.reaches(store, key))
            .collect()
    }

    /// Union of [`groups_containing`](Self::groups_containing) over `keys`
    pub fn groups_affected_by<'a>(&self, keys: impl IntoIterator<Item = &'a StoreKey>) -> Vec<ArtifactStore> {
        let mut affected = BTreeMap::new();
        for key in keys {
            for group in self.groups_containing(key) {
                affected.entry(group.key.clone()).or_insert(group);
            }
        }
        affected.into_values().collect()
    }

    fn reaches(&self, group: &ArtifactStore, target: &StoreKey) -> bool {
        let mut visited: HashSet<StoreKey> = HashSet::new();
        visited.insert(group.key.clone());
        let mut stack: Vec<StoreKey> = group.constituents().to_vec();

        while let Some(key) = stack.pop() {
            if &key == target {
                return true;
            }
            if !visited.insert(key.clone()) {
                continue;
            }
            if let Some(store) = self.registry.get(&key) {
                stack.extend(store.constituents().iter().cloned());
            }
        }

        false
    }

    fn require_group(&self, key: &StoreKey) -> DepotResult<ArtifactStore> {
        let store = self.registry.require(key)?;
        if !store.is_group() {
            return Err(DepotError::NotAGroup(key.clone()));
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::registry::MemoryStoreRegistry;
    use crate::store::StoreType;

    fn key(ty: StoreType, name: &str) -> StoreKey {
        StoreKey::new("maven", ty, name).unwrap()
    }

    fn resolver(stores: Vec<ArtifactStore>) -> GroupResolver {
        GroupResolver::new(Arc::new(MemoryStoreRegistry::from_stores(stores).unwrap()))
    }

    fn names(stores: &[ArtifactStore]) -> Vec<&str> {
        stores.iter().map(|s| s.key.name()).collect()
    }

    #[test]
    fn cyclic_groups_terminate() {
        let r = resolver(vec![
            ArtifactStore::hosted("maven", "A").unwrap(),
            ArtifactStore::remote("maven", "B", "https://example.org/repo").unwrap(),
            ArtifactStore::group(
                "maven",
                "G1",
                vec![key(StoreType::Hosted, "A"), key(StoreType::Group, "G2")],
            ).unwrap(),
            ArtifactStore::group(
                "maven",
                "G2",
                vec![key(StoreType::Remote, "B"), key(StoreType::Group, "G1")],
            ).unwrap(),
        ]);

        let members = r
            .resolve_concrete_members(&key(StoreType::Group, "G1"), false)
            .unwrap();
        assert_eq!(names(&members), vec!["A", "B"]);
    }

    #[test]
    fn nested_order_is_depth_first_left_to_right() {
        let r = resolver(vec![
            ArtifactStore::hosted("maven", "a").unwrap(),
            ArtifactStore::hosted("maven", "b").unwrap(),
            ArtifactStore::hosted("maven", "c").unwrap(),
            ArtifactStore::group(
                "maven",
                "inner",
                vec![key(StoreType::Hosted, "b"), key(StoreType::Hosted, "a")],
            ).unwrap(),
            ArtifactStore::group(
                "maven",
                "outer",
                vec![
                    key(StoreType::Hosted, "a"),
                    key(StoreType::Group, "inner"),
                    key(StoreType::Hosted, "c"),
                    key(StoreType::Hosted, "b"),
                ],
            ).unwrap(),
        ]);

        let members = r
            .resolve_concrete_members(&key(StoreType::Group, "outer"), false)
            .unwrap();
        assert_eq!(names(&members), vec!["a", "b", "c"]);
    }

    #[test]
    fn missing_members_are_skipped() {
        let r = resolver(vec![
            ArtifactStore::hosted("maven", "a").unwrap(),
            ArtifactStore::group(
                "maven",
                "g",
                vec![
                    key(StoreType::Hosted, "ghost"),
                    key(StoreType::Group, "ghost-group"),
                    key(StoreType::Hosted, "a"),
                ],
            ).unwrap(),
        ]);

        let members = r.resolve_concrete_members(&key(StoreType::Group, "g"), false).unwrap();
        assert_eq!(names(&members), vec!["a"]);
    }

    #[test]
    fn enabled_only_drops_disabled_stores_and_groups() {
        let r = resolver(vec![
            ArtifactStore::hosted("maven", "a").unwrap().disabled(),
            ArtifactStore::hosted("maven", "b").unwrap(),
            ArtifactStore::hosted("maven", "c").unwrap(),
            ArtifactStore::group("maven", "off", vec![key(StoreType::Hosted, "c")]).unwrap().disabled(),
            ArtifactStore::group(
                "maven",
                "g",
                vec![
                    key(StoreType::Hosted, "a"),
                    key(StoreType::Group, "off"),
                    key(StoreType::Hosted, "b"),
                ],
            ).unwrap(),
        ]);

        let g = key(StoreType::Group, "g");
        assert_eq!(names(&r.resolve_concrete_members(&g, true).unwrap()), vec!["b"]);
        assert_eq!(
            names(&r.resolve_concrete_members(&g, false).unwrap()),
            vec!["a", "c", "b"]
        );
    }

    #[test]
    fn non_group_and_unknown_keys_are_errors() {
        let r = resolver(vec![ArtifactStore::hosted("maven", "a").unwrap()]);
        assert!(matches!(
            r.resolve_concrete_members(&key(StoreType::Hosted, "a"), false),
            Err(DepotError::NotAGroup(_))
        ));
        assert!(matches!(
            r.resolve_concrete_members(&key(StoreType::Group, "nope"), false),
            Err(DepotError::StoreNotFound(_))
        ));
    }

    #[test]
    fn ordered_members_does_not_expand() {
        let r = resolver(vec![
            ArtifactStore::hosted("maven", "a").unwrap(),
            ArtifactStore::group("maven", "inner", vec![key(StoreType::Hosted, "a")]).unwrap(),
            ArtifactStore::group(
                "maven",
                "outer",
                vec![key(StoreType::Group, "inner"), key(StoreType::Hosted, "a")],
            ).unwrap(),
        ]);

        let members = r.ordered_members(&key(StoreType::Group, "outer"), false).unwrap();
        assert_eq!(names(&members), vec!["inner", "a"]);
    }

    #[test]
    fn groups_containing_follows_nesting_and_cycles() {
        let r = resolver(vec![
            ArtifactStore::hosted("maven", "a").unwrap(),
            ArtifactStore::hosted("maven", "z").unwrap(),
            ArtifactStore::group("maven", "inner", vec![key(StoreType::Hosted, "a")]).unwrap(),
            ArtifactStore::group("maven", "outer", vec![key(StoreType::Group, "inner")]).unwrap(),
            ArtifactStore::group(
                "maven",
                "loop1",
                vec![key(StoreType::Group, "loop2")],
            ).unwrap(),
            ArtifactStore::group(
                "maven",
                "loop2",
                vec![key(StoreType::Group, "loop1")],
            ).unwrap(),
        ]);

        let containing = r.groups_containing(&key(StoreType::Hosted, "a"));
        assert_eq!(names(&containing), vec!["inner", "outer"]);
        assert!(r.groups_containing(&key(StoreType::Hosted, "z")).is_empty());

        let affected = r.groups_affected_by([
            &key(StoreType::Hosted, "a"),
            &key(StoreType::Group, "inner"),
        ]);
        assert_eq!(names(&affected), vec!["inner", "outer"]);
    }
}
