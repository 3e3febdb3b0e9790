//! Path mask filtering
//!
//! A store's `path_mask_patterns` restrict which paths it may answer. Plain
//! patterns are path prefixes; `r|<regex>|` patterns are regular expressions
//! matched against the whole path.

use crate::filter::{retain, RepositoryFilter};
use crate::store::{ArtifactStore, StoreKey};
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::warn;

const REGEX_PREFIX: &str = "r|";
const REGEX_SUFFIX: &str = "|";

/// Drops candidates whose path masks reject the requested path.
///
/// Regex masks are compiled on first use and kept for the life of the
/// filter. Invalid ones are cached as `None` and match nothing.
#[derive(Default)]
pub struct PathMaskFilter {
    compiled: RwLock<HashMap<String, Option<Regex>>>,
}

impl PathMaskFilter {
    pub const PRIORITY: i32 = 100;

    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `store` may serve `path` according to its masks
    pub fn path_allowed(&self, store: &ArtifactStore, path: &str) -> bool {
        if store.path_mask_patterns.is_empty() {
            return true;
        }
        let path = path.trim_start_matches('/');
        store
            .path_mask_patterns
            .iter()
            .any(|pattern| self.pattern_matches(pattern, path))
    }

    fn pattern_matches(&self, pattern: &str, path: &str) -> bool {
        match regex_body(pattern) {
            Some(body) => self.regex(pattern, body).is_some_and(|re| re.is_match(path)),
            None => path.starts_with(pattern.trim_start_matches('/')),
        }
    }

    fn regex(&self, pattern: &str, body: &str) -> Option<Regex> {
        {
            let compiled = self.compiled.read().unwrap_or_else(|e| e.into_inner());
            if let Some(cached) = compiled.get(pattern) {
                return cached.clone();
            }
        }

        let regex = match Regex::new(&format!("^(?:{})$", body)) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Ignoring invalid path mask {}: {}", pattern, e);
                None
            }
        };

        let mut compiled = self.compiled.write().unwrap_or_else(|e| e.into_inner());
        compiled.entry(pattern.to_string()).or_insert(regex).clone()
    }

    #[cfg(test)]
    fn compiled_count(&self) -> usize {
        self.compiled.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

fn regex_body(pattern: &str) -> Option<&str> {
    pattern
        .strip_prefix(REGEX_PREFIX)?
        .strip_suffix(REGEX_SUFFIX)
}

impl RepositoryFilter for PathMaskFilter {
    fn name(&self) -> &str {
        "path-mask"
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }

    fn can_process(&self, _path: &str, _group: &StoreKey) -> bool {
        true
    }

    fn filter<'a>(&self, path: &str, _group: &StoreKey, candidates: &'a [ArtifactStore]) -> Cow<'a, [ArtifactStore]> {
        retain(candidates, |store| self.path_allowed(store, path))
    }
}
