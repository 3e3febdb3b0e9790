//! Artifact store definitions

use crate::error::DepotResult;
use crate::store::key::{StoreKey, StoreType};
use serde::{Deserialize, Serialize};

/// A named content location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactStore {
    /// Identity of the store
    pub key: StoreKey,

    /// Disabled stores are skipped when resolving enabled members
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Paths this store may answer for (prefixes, or `r|regex|`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path_mask_patterns: Vec<String>,

    /// Variant-specific data
    pub kind: StoreKind,
}

fn default_enabled() -> bool {
    true
}

/// Variant data for each store type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreKind {
    Hosted {
        #[serde(default = "default_enabled")]
        allow_releases: bool,
        #[serde(default = "default_enabled")]
        allow_snapshots: bool,
    },
    Remote {
        url: String,
    },
    Group {
        /// Ordered constituents; may name other groups
        #[serde(default)]
        constituents: Vec<StoreKey>,
    },
}

impl ArtifactStore {
    /// Create a hosted store accepting releases and snapshots
    pub fn hosted(package_type: &str, name: &str) -> DepotResult<Self> {
        Ok(Self::with_kind(
            StoreKey::new(package_type, StoreType::Hosted, name)?,
            StoreKind::Hosted {
                allow_releases: true,
                allow_snapshots: true,
            },
        ))
    }

    /// Create a remote store proxying `url`
    pub fn remote(package_type: &str, name: &str, url: impl Into<String>) -> DepotResult<Self> {
        Ok(Self::with_kind(
            StoreKey::new(package_type, StoreType::Remote, name)?,
            StoreKind::Remote { url: url.into() },
        ))
    }

    /// Create a group with the given ordered constituents
    pub fn group(package_type: &str, name: &str, constituents: Vec<StoreKey>) -> DepotResult<Self> {
        Ok(Self::with_kind(
            StoreKey::new(package_type, StoreType::Group, name)?,
            StoreKind::Group { constituents },
        ))
    }

    fn with_kind(key: StoreKey, kind: StoreKind) -> Self {
        Self {
            key,
            enabled: true,
            description: None,
            path_mask_patterns: Vec::new(),
            kind,
        }
    }

    /// Builder-style toggle of the enabled flag
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Builder-style path mask patterns
    pub fn with_path_masks(mut self, patterns: &[&str]) -> Self {
        self.path_mask_patterns = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn store_type(&self) -> StoreType {
        match self.kind {
            StoreKind::Hosted { .. } => StoreType::Hosted,
            StoreKind::Remote { .. } => StoreType::Remote,
            StoreKind::Group { .. } => StoreType::Group,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, StoreKind::Group { .. })
    }

    /// Ordered constituents of a group; empty for concrete stores
    pub fn constituents(&self) -> &[StoreKey] {
        match &self.kind {
            StoreKind::Group { constituents } => constituents,
            _ => &[],
        }
    }

    /// Mutable access to a group's constituents
    pub fn constituents_mut(&mut self) -> Option<&mut Vec<StoreKey>> {
        match &mut self.kind {
            StoreKind::Group { constituents } => Some(constituents),
            _ => None,
        }
    }

    /// Upstream URL of a remote store
    pub fn remote_url(&self) -> Option<&str> {
        match &self.kind {
            StoreKind::Remote { url } => Some(url),
            _ => None,
        }
    }
}
