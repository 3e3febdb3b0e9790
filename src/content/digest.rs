//! Content checksums

use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentDigest {
    Md5,
    Sha1,
    Sha256,
}

impl ContentDigest {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }

    /// Hex digest of `bytes`
    pub fn hex(&self, bytes: &[u8]) -> String {
        match self {
            Self::Md5 => format!("{:x}", md5::compute(bytes)),
            Self::Sha1 => hex::encode(Sha1::digest(bytes)),
            Self::Sha256 => hex::encode(Sha256::digest(bytes)),
        }
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute every requested digest of `bytes`
pub fn compute(bytes: &[u8], algorithms: &[ContentDigest]) -> HashMap<ContentDigest, String> {
    algorithms
        .iter()
        .map(|algorithm| (*algorithm, algorithm.hex(bytes)))
        .collect()
}
