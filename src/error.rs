//! Error types for Depot
//!
//! All modules use `DepotResult<T>` as their return type.

use crate::store::StoreKey;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Depot operations
pub type DepotResult<T> = Result<T, DepotError>;

/// All errors that can occur in Depot
#[derive(Error, Debug)]
pub enum DepotError {
    // Store model errors
    #[error("Invalid store key '{value}': {reason}")]
    InvalidStoreKey { value: String, reason: String },

    #[error("Store not found: {0}")]
    StoreNotFound(StoreKey),

    #[error("Store {0} is not a group")]
    NotAGroup(StoreKey),

    #[error("Store already exists: {0}")]
    StoreExists(StoreKey),

    #[error("Cannot promote {0} into itself")]
    SameStorePromotion(StoreKey),

    // Content errors
    #[error("Content not found: {path} in {store}")]
    ContentNotFound { store: StoreKey, path: String },

    #[error("Invalid content path '{path}': {reason}")]
    PathInvalid { path: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    // Tracking errors
    #[error("Invalid tracking id '{id}': {reason}")]
    InvalidTrackingKey { id: String, reason: String },

    #[error("No tracking record available for: {0}")]
    TrackingRecordNotFound(String),

    #[error("Tracking record {key} is corrupt and cannot be read: {reason}")]
    TrackingRecordCorrupt { key: String, reason: String },

    // Filter rule errors
    #[error("Invalid filter rule {path}: {reason}")]
    RuleInvalid { path: PathBuf, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl DepotError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a storage error from anything displayable
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::StoreNotFound(_) => Some("Define the store under [[stores]] in config.toml"),
            Self::InvalidStoreKey { .. } => {
                Some("Store keys look like maven:hosted:releases (packageType:storeType:name)")
            }
            Self::SameStorePromotion(_) => Some("Promote into a different target store"),
            Self::TrackingRecordNotFound(_) => {
                Some("Record content first with: depot track record <id> <store> <path>")
            }
            Self::ConfigInvalid { .. } => Some("Check the file with: depot config show"),
            _ => None,
        }
    }
}
