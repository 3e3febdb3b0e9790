//! Repository filter chain
//!
//! Narrows the candidate stores that may answer a request for a path within a
//! group. Filters run in priority order (highest first), each receiving the
//! previous filter's output. A filter that removes nothing hands back the
//! borrowed input, so `Cow::Borrowed` from the chain means no narrowing.

pub mod path_mask;
pub mod rules;
pub mod snapshot;

pub use path_mask::PathMaskFilter;
pub use rules::{load_rule_filters, Rule, RuleFilter};
pub use snapshot::SnapshotPolicyFilter;

use crate::store::{ArtifactStore, StoreKey};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::trace;

/// A single narrowing step
pub trait RepositoryFilter: Send + Sync {
    /// Identifier used in logs
    fn name(&self) -> &str;

    /// Higher runs first
    fn priority(&self) -> i32;

    /// Whether this filter applies to `path` in `group` at all
    fn can_process(&self, path: &str, group: &StoreKey) -> bool;

    /// Narrow candidates for a lookup that returns every match
    fn filter<'a>(&self, path: &str, group: &StoreKey, candidates: &'a [ArtifactStore]) -> Cow<'a, [ArtifactStore]>;

    /// Narrow candidates for a lookup that stops at the first match
    fn filter_for_first_match<'a>(
        &self,
        path: &str,
        group: &StoreKey,
        candidates: &'a [ArtifactStore],
    ) -> Cow<'a, [ArtifactStore]> {
        self.filter(path, group, candidates)
    }
}

/// Keep the candidates accepted by `keep`, borrowing when all are kept
pub fn retain<'a>(
    candidates: &'a [ArtifactStore],
    keep: impl Fn(&ArtifactStore) -> bool,
) -> Cow<'a, [ArtifactStore]> {
    if candidates.iter().all(&keep) {
        Cow::Borrowed(candidates)
    } else {
        Cow::Owned(candidates.iter().filter(|store| keep(store)).cloned().collect())
    }
}

/// Priority-ordered set of filters
#[derive(Default, Clone)]
pub struct FilterChain {
    filters: Vec<Arc<dyn RepositoryFilter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain with the built-in path mask and snapshot policy filters
    pub fn with_defaults() -> Self {
        let mut chain = Self::new();
        chain.register(Arc::new(PathMaskFilter::new()));
        chain.register(Arc::new(SnapshotPolicyFilter));
        chain
    }

    /// Add a filter; equal priorities keep registration order
    pub fn register(&mut self, filter: Arc<dyn RepositoryFilter>) {
        self.filters.push(filter);
        self.filters.sort_by_key(|f| std::cmp::Reverse(f.priority()));
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Filter names in execution order
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn filter<'a>(&self, path: &str, group: &StoreKey, candidates: &'a [ArtifactStore]) -> Cow<'a, [ArtifactStore]> {
        self.run(path, group, candidates, |f, c| f.filter(path, group, c))
    }

    pub fn filter_for_first_match<'a>(
        &self,
        path: &str,
        group: &StoreKey,
        candidates: &'a [ArtifactStore],
    ) -> Cow<'a, [ArtifactStore]> {
        self.run(path, group, candidates, |f, c| f.filter_for_first_match(path, group, c))
    }

    fn run<'a, F>(&self, path: &str, group: &StoreKey, candidates: &'a [ArtifactStore], step: F) -> Cow<'a, [ArtifactStore]>
    where
        F: for<'c> Fn(&dyn RepositoryFilter, &'c [ArtifactStore]) -> Cow<'c, [ArtifactStore]>,
    {
        let mut current = Cow::Borrowed(candidates);

        for filter in &self.filters {
            if !filter.can_process(path, group) {
                continue;
            }

            let before = current.len();
            current = match current {
                Cow::Borrowed(slice) => step(filter.as_ref(), slice),
                Cow::Owned(owned) => {
                    let narrowed = match step(filter.as_ref(), &owned) {
                        Cow::Borrowed(_) => None,
                        Cow::Owned(narrowed) => Some(narrowed),
                    };
                    Cow::Owned(narrowed.unwrap_or(owned))
                }
            };
            trace!(
                "Filter {} narrowed {} in {} from {} to {}",
                filter.name(),
                path,
                group,
                before,
                current.len()
            );
        }

        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DropNamed {
        name: &'static str,
        priority: i32,
        drop: &'static str,
    }

    impl RepositoryFilter for DropNamed {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn can_process(&self, _path: &str, _group: &StoreKey) -> bool {
            true
        }

        fn filter<'a>(&self, _path: &str, _group: &StoreKey, candidates: &'a [ArtifactStore]) -> Cow<'a, [ArtifactStore]> {
            retain(candidates, |store| store.key.name() != self.drop)
        }
    }

    fn group() -> StoreKey {
        StoreKey::parse("maven:group:public").unwrap()
    }

    fn candidates() -> Vec<ArtifactStore> {
        vec![
            ArtifactStore::hosted("maven", "a").unwrap(),
            ArtifactStore::hosted("maven", "b").unwrap(),
            ArtifactStore::hosted("maven", "c").unwrap(),
        ]
    }

    #[test]
    fn no_narrowing_stays_borrowed() {
        let mut chain = FilterChain::new();
        chain.register(Arc::new(DropNamed {
            name: "noop",
            priority: 1,
            drop: "zzz",
        }));

        let stores = candidates();
        let result = chain.filter("org/x.jar", &group(), &stores);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn output_feeds_next_filter() {
        let mut chain = FilterChain::new();
        chain.register(Arc::new(DropNamed {
            name: "drop-a",
            priority: 1,
            drop: "a",
        }));
        chain.register(Arc::new(DropNamed {
            name: "drop-c",
            priority: 2,
            drop: "c",
        }));

        let stores = candidates();
        let result = chain.filter("org/x.jar", &group(), &stores);
        assert!(matches!(result, Cow::Owned(_)));
        let names: Vec<&str> = result.iter().map(|s| s.key.name()).collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn highest_priority_runs_first() {
        let mut chain = FilterChain::new();
        chain.register(Arc::new(DropNamed {
            name: "low",
            priority: 1,
            drop: "a",
        }));
        chain.register(Arc::new(DropNamed {
            name: "high",
            priority: 10,
            drop: "b",
        }));
        assert_eq!(chain.names(), vec!["high", "low"]);
    }

    #[test]
    fn empty_chain_is_identity() {
        let stores = candidates();
        let result = FilterChain::new().filter_for_first_match("x", &group(), &stores);
        assert!(matches!(result, Cow::Borrowed(_)));
    }
}
