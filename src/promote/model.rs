//! Promotion requests and results
//!
//! These are the JSON documents exchanged with callers. A result carries its
//! request so it can be fed back into resume or rollback.

use crate::store::StoreKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Copy (or move) content from one store to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoteRequest {
    pub source: StoreKey,
    pub target: StoreKey,

    /// Paths to promote; empty or absent means everything in `source`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<BTreeSet<String>>,

    /// Delete each path from `source` after it reaches `target`
    #[serde(default)]
    pub purge_source: bool,

    /// Report what would be promoted without writing anything
    #[serde(default)]
    pub dry_run: bool,
}

impl PromoteRequest {
    pub fn new(source: StoreKey, target: StoreKey) -> Self {
        Self {
            source,
            target,
            paths: None,
            purge_source: false,
            dry_run: false,
        }
    }

    pub fn with_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    pub fn purging_source(mut self) -> Self {
        self.purge_source = true;
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Explicit paths, if any were given
    pub fn explicit_paths(&self) -> Option<&BTreeSet<String>> {
        self.paths.as_ref().filter(|paths| !paths.is_empty())
    }
}

/// Outcome of a promote, resume or rollback
///
/// `pending_paths` and `completed_paths` never overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoteResult {
    pub request: PromoteRequest,

    #[serde(default)]
    pub pending_paths: BTreeSet<String>,

    #[serde(default)]
    pub completed_paths: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PromoteResult {
    pub fn new(request: PromoteRequest) -> Self {
        Self {
            request,
            pending_paths: BTreeSet::new(),
            completed_paths: BTreeSet::new(),
            error: None,
        }
    }

    /// Nothing left to do and no error
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.pending_paths.is_empty()
    }

    /// Move `path` from pending to completed
    pub(crate) fn complete(&mut self, path: &str) {
        self.pending_paths.remove(path);
        self.completed_paths.insert(path.to_string());
    }

    /// Move `path` from completed back to pending
    pub(crate) fn revert(&mut self, path: &str) {
        self.completed_paths.remove(path);
        self.pending_paths.insert(path.to_string());
    }
}

/// Add a store to a group's membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPromoteRequest {
    pub source: StoreKey,
    pub target_group: StoreKey,

    #[serde(default)]
    pub dry_run: bool,
}

impl GroupPromoteRequest {
    pub fn new(source: StoreKey, target_group: StoreKey) -> Self {
        Self {
            source,
            target_group,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPromoteResult {
    pub request: GroupPromoteRequest,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GroupPromoteResult {
    pub fn ok(request: GroupPromoteRequest) -> Self {
        Self { request, error: None }
    }

    pub fn failed(request: GroupPromoteRequest, error: impl Into<String>) -> Self {
        Self {
            request,
            error: Some(error.into()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}
