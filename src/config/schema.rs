//! Configuration schema for depot
//!
//! Configuration is stored at `~/.config/depot/config.toml`

use crate::store::{ArtifactStore, StoreKey, StoreKind, StoreType};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Content storage settings
    pub storage: StorageConfig,

    /// Content tracking settings
    pub tracking: TrackingConfig,

    /// Repository filter settings
    pub filters: FiltersConfig,

    /// Store definitions
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stores: Vec<StoreConfig>,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Content storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for store content
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: data_dir().join("storage"),
        }
    }
}

/// Content tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Directory holding persisted tracking records
    pub dir: PathBuf,

    /// Idle records are evicted to disk after this many seconds
    pub timeout_secs: u64,

    /// Maximum tracking records kept in memory
    pub max_entries: usize,

    /// Seconds between background eviction sweeps
    pub sweep_interval_secs: u64,

    /// Base URL used for content links in tracking reports
    pub api_base_url: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            dir: data_dir().join("tracking"),
            timeout_secs: 3600,
            max_entries: 1000,
            sweep_interval_secs: 60,
            api_base_url: "http://localhost:8080/api".to_string(),
        }
    }
}

/// Repository filter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FiltersConfig {
    /// Directory of `*.toml` filter rules
    pub rules_dir: Option<PathBuf>,
}

/// One `[[stores]]` entry
///
/// The store type comes from the key; `url` applies to remote stores,
/// `members` to groups, and the release/snapshot flags to hosted stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub key: StoreKey,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path_mask_patterns: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<StoreKey>,

    #[serde(default = "default_true")]
    pub allow_releases: bool,

    #[serde(default = "default_true")]
    pub allow_snapshots: bool,
}

fn default_true() -> bool {
    true
}

impl StoreConfig {
    /// Build the store definition; fails with a reason on inconsistent fields
    pub fn to_store(&self) -> Result<ArtifactStore, String> {
        let kind = match self.key.store_type() {
            StoreType::Hosted => StoreKind::Hosted {
                allow_releases: self.allow_releases,
                allow_snapshots: self.allow_snapshots,
            },
            StoreType::Remote => StoreKind::Remote {
                url: self
                    .url
                    .clone()
                    .ok_or_else(|| format!("remote store {} needs a url", self.key))?,
            },
            StoreType::Group => StoreKind::Group {
                constituents: self.members.clone(),
            },
        };

        if !self.members.is_empty() && !self.key.is_group() {
            return Err(format!("{} is not a group but lists members", self.key));
        }

        Ok(ArtifactStore {
            key: self.key.clone(),
            enabled: self.enabled,
            description: self.description.clone(),
            path_mask_patterns: self.path_mask_patterns.clone(),
            kind,
        })
    }
}

/// Base directory for depot data
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("depot")
}
