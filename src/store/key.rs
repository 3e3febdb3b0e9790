//! Store identity
//!
//! A [`StoreKey`] names one content location. Its canonical string form
//! `packageType:storeType:name` is the only identity that leaves the
//! process (JSON, record file names, merge provenance files).

use crate::error::{DepotError, DepotResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Package type assumed for legacy `storeType:name` keys
pub const DEFAULT_PACKAGE_TYPE: &str = "maven";

/// Classification of a content store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    /// Writable store owned by this server
    Hosted,
    /// Caching proxy of an upstream origin
    Remote,
    /// Ordered virtual aggregation of other stores
    Group,
}

impl StoreType {
    /// Lowercase name used in keys and URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hosted => "hosted",
            Self::Remote => "remote",
            Self::Group => "group",
        }
    }
}

impl fmt::Display for StoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreType {
    type Err = DepotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hosted" => Ok(Self::Hosted),
            "remote" => Ok(Self::Remote),
            "group" => Ok(Self::Group),
            other => Err(DepotError::InvalidStoreKey {
                value: other.to_string(),
                reason: "store type must be one of hosted, remote, group".to_string(),
            }),
        }
    }
}

/// Unique identifier of a content store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoreKey {
    package_type: String,
    store_type: StoreType,
    name: String,
}

impl StoreKey {
    /// Create a key from its parts.
    ///
    /// Parts are checked the same way [`StoreKey::parse`] checks them, so
    /// every key survives a format and parse cycle and stays inside its
    /// content directory.
    pub fn new(package_type: impl Into<String>, store_type: StoreType, name: impl Into<String>) -> DepotResult<Self> {
        let package_type = package_type.into();
        let name = name.into();
        let value = format!("{}:{}:{}", package_type, store_type, name);
        validate_part(&value, "package type", &package_type)?;
        validate_part(&value, "name", &name)?;

        Ok(Self {
            package_type,
            store_type,
            name,
        })
    }

    /// Parse the canonical `packageType:storeType:name` form.
    ///
    /// The legacy two-part `storeType:name` form is accepted and gets
    /// [`DEFAULT_PACKAGE_TYPE`].
    pub fn parse(value: &str) -> DepotResult<Self> {
        let parts: Vec<&str> = value.split(':').collect();
        let (package_type, store_type, name) = match parts.as_slice() {
            [pkg, ty, name] => (*pkg, *ty, *name),
            [ty, name] => (DEFAULT_PACKAGE_TYPE, *ty, *name),
            _ => {
                return Err(DepotError::InvalidStoreKey {
                    value: value.to_string(),
                    reason: "expected packageType:storeType:name".to_string(),
                })
            }
        };

        let store_type = store_type.parse::<StoreType>().map_err(|_| DepotError::InvalidStoreKey {
            value: value.to_string(),
            reason: format!("unknown store type '{}'", store_type),
        })?;

        Self::new(package_type, store_type, name).map_err(|err| match err {
            DepotError::InvalidStoreKey { reason, .. } => DepotError::InvalidStoreKey {
                value: value.to_string(),
                reason,
            },
            other => other,
        })
    }

    pub fn package_type(&self) -> &str {
        &self.package_type
    }

    pub fn store_type(&self) -> StoreType {
        self.store_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_group(&self) -> bool {
        self.store_type == StoreType::Group
    }
}

fn validate_part(value: &str, what: &str, part: &str) -> DepotResult<()> {
    if part.is_empty() {
        return Err(DepotError::InvalidStoreKey {
            value: value.to_string(),
            reason: format!("{} cannot be empty", what),
        });
    }
    if part.contains(':') {
        return Err(DepotError::InvalidStoreKey {
            value: value.to_string(),
            reason: format!("{} must not contain ':'", what),
        });
    }
    if part.contains('/') || part.contains('\\') || part == "." || part == ".." {
        return Err(DepotError::InvalidStoreKey {
            value: value.to_string(),
            reason: format!("{} must not contain path separators", what),
        });
    }
    Ok(())
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.package_type, self.store_type, self.name)
    }
}

impl FromStr for StoreKey {
    type Err = DepotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StoreKey {
    type Error = DepotError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StoreKey> for String {
    fn from(key: StoreKey) -> Self {
        key.to_string()
    }
}
