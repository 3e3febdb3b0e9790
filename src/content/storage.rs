//! Content storage abstraction
//!
//! Promotion, tracking reports and merged-content generation only ever talk
//! to [`ContentStorage`], never to a concrete backend.

use crate::content::digest::{self, ContentDigest};
use crate::error::{DepotError, DepotResult};
use crate::store::StoreKey;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Readable content handle. Dropping it releases the underlying resource.
pub type ContentStream = Box<dyn AsyncRead + Send + Unpin>;

/// Reference to a single content item within a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    store: StoreKey,
    path: String,
    exists: bool,
}

impl Transfer {
    pub fn new(store: StoreKey, path: impl Into<String>, exists: bool) -> Self {
        Self {
            store,
            path: path.into(),
            exists,
        }
    }

    pub fn store(&self) -> &StoreKey {
        &self.store
    }

    /// Normalized path (no leading slash)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the content existed when this reference was resolved
    pub fn exists(&self) -> bool {
        self.exists
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.store, self.path)
    }
}

/// Abstract content storage interface
///
/// Implemented by the in-memory backend (tests, embedding) and the
/// filesystem backend.
#[async_trait]
pub trait ContentStorage: Send + Sync {
    /// Every content item at or below `root` in `store`, sorted by path
    async fn list_recursively(&self, store: &StoreKey, root: &str) -> DepotResult<Vec<Transfer>>;

    /// Resolve a reference to `path` in `store`; it may not exist
    async fn storage_reference(&self, store: &StoreKey, path: &str) -> DepotResult<Transfer>;

    /// Open a content stream for an existing transfer
    async fn open(&self, transfer: &Transfer) -> DepotResult<ContentStream>;

    /// Write `stream` to `path` in `store`, replacing existing content
    async fn store(&self, store: &StoreKey, path: &str, stream: ContentStream) -> DepotResult<Transfer>;

    /// Delete content, returning whether anything was removed
    async fn delete(&self, store: &StoreKey, path: &str) -> DepotResult<bool>;

    /// Hex digests of the content at `path`
    async fn digest(
        &self,
        store: &StoreKey,
        path: &str,
        algorithms: &[ContentDigest],
    ) -> DepotResult<HashMap<ContentDigest, String>> {
        let transfer = self.storage_reference(store, path).await?;
        let bytes = self.read_bytes(&transfer).await?;
        Ok(digest::compute(&bytes, algorithms))
    }

    /// Read a whole transfer into memory
    async fn read_bytes(&self, transfer: &Transfer) -> DepotResult<Vec<u8>> {
        if !transfer.exists() {
            return Err(DepotError::ContentNotFound {
                store: transfer.store().clone(),
                path: transfer.path().to_string(),
            });
        }

        let mut stream = self.open(transfer).await?;
        let mut buf = Vec::new();
        stream
            .read_to_end(&mut buf)
            .await
            .map_err(|e| DepotError::io(format!("reading {}", transfer), e))?;
        Ok(buf)
    }

    /// Write an in-memory buffer
    async fn write_bytes(&self, store: &StoreKey, path: &str, bytes: Vec<u8>) -> DepotResult<Transfer> {
        self.store(store, path, Box::new(std::io::Cursor::new(bytes))).await
    }
}

/// Normalize a content path: strip leading/trailing slashes, collapse empty
/// segments, reject parent traversal.
pub fn normalize_path(path: &str) -> DepotResult<String> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(DepotError::PathInvalid {
                    path: path.to_string(),
                    reason: "parent traversal is not allowed".to_string(),
                })
            }
            s if s.contains('\\') || s.contains('\0') => {
                return Err(DepotError::PathInvalid {
                    path: path.to_string(),
                    reason: "path contains illegal characters".to_string(),
                })
            }
            s => segments.push(s),
        }
    }
    Ok(segments.join("/"))
}

/// Whether `path` lies at or below normalized `root` ("" is the store root)
pub fn is_under(path: &str, root: &str) -> bool {
    root.is_empty() || path == root || path.starts_with(&format!("{}/", root))
}
