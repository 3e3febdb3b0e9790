//! Tracking records
//!
//! A tracking record attributes uploads and downloads to a session key,
//! grouped by the store the content lives in.

use crate::error::{DepotError, DepotResult};
use crate::store::StoreKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Session identifier for content tracking.
///
/// May carry an implicit tracked store used by pass-through tracking.
/// Identity is the id alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingKey {
    id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tracked_store: Option<StoreKey>,
}

impl TrackingKey {
    /// Validate and wrap a tracking id
    pub fn new(id: impl Into<String>) -> DepotResult<Self> {
        let id = id.into();
        validate_id(&id)?;
        Ok(Self {
            id,
            tracked_store: None,
        })
    }

    pub fn with_tracked_store(mut self, store: StoreKey) -> Self {
        self.tracked_store = Some(store);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracked_store(&self) -> Option<&StoreKey> {
        self.tracked_store.as_ref()
    }
}

/// Tracking ids become file names, so they must stay a single path segment
fn validate_id(id: &str) -> DepotResult<()> {
    let reason = if id.trim().is_empty() {
        Some("tracking id cannot be empty")
    } else if id.contains('/') || id.contains('\\') {
        Some("tracking id cannot contain path separators")
    } else if id.contains("..") {
        Some("tracking id cannot contain '..'")
    } else if id.chars().any(char::is_control) {
        Some("tracking id cannot contain control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(DepotError::InvalidTrackingKey {
            id: id.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

impl PartialEq for TrackingKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TrackingKey {}

impl Hash for TrackingKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TrackingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Direction of a tracked content access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreEffect {
    Upload,
    Download,
}

impl fmt::Display for StoreEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload => write!(f, "upload"),
            Self::Download => write!(f, "download"),
        }
    }
}

/// Paths moved in and out of one store. A path may be in both sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedStoreRecord {
    #[serde(default)]
    pub uploaded_paths: BTreeSet<String>,

    #[serde(default)]
    pub downloaded_paths: BTreeSet<String>,
}

impl AffectedStoreRecord {
    /// Add `path` to the set for `effect`; returns whether it was new
    pub fn add(&mut self, path: impl Into<String>, effect: StoreEffect) -> bool {
        match effect {
            StoreEffect::Upload => self.uploaded_paths.insert(path.into()),
            StoreEffect::Download => self.downloaded_paths.insert(path.into()),
        }
    }

    pub fn paths(&self, effect: StoreEffect) -> &BTreeSet<String> {
        match effect {
            StoreEffect::Upload => &self.uploaded_paths,
            StoreEffect::Download => &self.downloaded_paths,
        }
    }
}

/// Everything recorded under one tracking key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedContentRecord {
    pub key: TrackingKey,

    #[serde(default)]
    pub affected_stores: BTreeMap<StoreKey, AffectedStoreRecord>,
}

impl TrackedContentRecord {
    pub fn new(key: TrackingKey) -> Self {
        Self {
            key,
            affected_stores: BTreeMap::new(),
        }
    }

    /// Record one access; returns whether the record changed
    pub fn record(&mut self, store: &StoreKey, path: impl Into<String>, effect: StoreEffect) -> bool {
        self.affected_stores
            .entry(store.clone())
            .or_default()
            .add(path, effect)
    }

    pub fn affected_store(&self, store: &StoreKey) -> Option<&AffectedStoreRecord> {
        self.affected_stores.get(store)
    }

    pub fn is_empty(&self) -> bool {
        self.affected_stores.is_empty()
    }
}

/// One line of a tracking report
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedContentEntry {
    pub store_key: StoreKey,
    pub path: String,
    pub local_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_url: Option<String>,

    pub md5: String,
    pub sha256: String,
}

/// Report of everything a tracking session moved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingReport {
    pub tracking_key: String,
    pub uploads: Vec<TrackedContentEntry>,
    pub downloads: Vec<TrackedContentEntry>,
}
