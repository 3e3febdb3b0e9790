//! In-memory content storage
//!
//! Used for embedding and tests. Counts open content handles so callers can
//! verify every stream is released, and supports injected faults per path.

use crate::content::storage::{is_under, normalize_path, ContentStorage, ContentStream, Transfer};
use crate::error::{DepotError, DepotResult};
use crate::store::StoreKey;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

/// Operation an injected fault applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultOp {
    /// Opened streams fail on first read
    Read,
    /// `store` fails
    Write,
    /// `delete` fails
    Delete,
}

type FaultKey = (FaultOp, StoreKey, String);

/// Content storage held in process memory
#[derive(Default)]
pub struct MemoryStorage {
    content: Mutex<BTreeMap<StoreKey, BTreeMap<String, Vec<u8>>>>,
    faults: Mutex<HashMap<FaultKey, usize>>,
    open_handles: Arc<AtomicUsize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `times` operations of `op` on `path` fail
    pub fn inject_fault(&self, op: FaultOp, store: &StoreKey, path: &str, times: usize) {
        let path = normalize_path(path).unwrap_or_else(|_| path.to_string());
        let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
        faults.insert((op, store.clone(), path), times);
    }

    /// Number of content streams currently open
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    /// Whether `path` exists in `store`
    pub fn contains(&self, store: &StoreKey, path: &str) -> bool {
        let Ok(path) = normalize_path(path) else {
            return false;
        };
        let content = self.content.lock().unwrap_or_else(|e| e.into_inner());
        content.get(store).is_some_and(|items| items.contains_key(&path))
    }

    /// Raw content, if present
    pub fn get(&self, store: &StoreKey, path: &str) -> Option<Vec<u8>> {
        let path = normalize_path(path).ok()?;
        let content = self.content.lock().unwrap_or_else(|e| e.into_inner());
        content.get(store).and_then(|items| items.get(&path).cloned())
    }

    /// Insert content directly, bypassing faults
    pub fn put(&self, store: &StoreKey, path: &str, bytes: impl Into<Vec<u8>>) {
        let path = normalize_path(path).unwrap_or_else(|_| path.to_string());
        let mut content = self.content.lock().unwrap_or_else(|e| e.into_inner());
        content.entry(store.clone()).or_default().insert(path, bytes.into());
    }

    fn take_fault(&self, op: FaultOp, store: &StoreKey, path: &str) -> bool {
        let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
        let key = (op, store.clone(), path.to_string());
        match faults.get_mut(&key) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn handle<R: AsyncRead + Send + Unpin + 'static>(&self, inner: R) -> ContentStream {
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Box::new(CountedHandle {
            inner,
            open_handles: Arc::clone(&self.open_handles),
        })
    }
}

#[async_trait]
impl ContentStorage for MemoryStorage {
    async fn list_recursively(&self, store: &StoreKey, root: &str) -> DepotResult<Vec<Transfer>> {
        let root = normalize_path(root)?;
        let content = self.content.lock().unwrap_or_else(|e| e.into_inner());
        Ok(content
            .get(store)
            .map(|items| {
                items
                    .keys()
                    .filter(|path| is_under(path, &root))
                    .map(|path| Transfer::new(store.clone(), path.clone(), true))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn storage_reference(&self, store: &StoreKey, path: &str) -> DepotResult<Transfer> {
        let path = normalize_path(path)?;
        let exists = self.contains(store, &path);
        Ok(Transfer::new(store.clone(), path, exists))
    }

    async fn open(&self, transfer: &Transfer) -> DepotResult<ContentStream> {
        let bytes = self
            .get(transfer.store(), transfer.path())
            .ok_or_else(|| DepotError::ContentNotFound {
                store: transfer.store().clone(),
                path: transfer.path().to_string(),
            })?;

        if self.take_fault(FaultOp::Read, transfer.store(), transfer.path()) {
            return Ok(self.handle(FailingReader));
        }
        Ok(self.handle(io::Cursor::new(bytes)))
    }

    async fn store(&self, store: &StoreKey, path: &str, mut stream: ContentStream) -> DepotResult<Transfer> {
        let path = normalize_path(path)?;
        if self.take_fault(FaultOp::Write, store, &path) {
            return Err(DepotError::storage(format!("injected write failure for {}/{}", store, path)));
        }

        let mut buf = Vec::new();
        stream
            .read_to_end(&mut buf)
            .await
            .map_err(|e| DepotError::io(format!("reading content for {}/{}", store, path), e))?;
        drop(stream);

        self.put(store, &path, buf);
        Ok(Transfer::new(store.clone(), path, true))
    }

    async fn delete(&self, store: &StoreKey, path: &str) -> DepotResult<bool> {
        let path = normalize_path(path)?;
        if self.take_fault(FaultOp::Delete, store, &path) {
            return Err(DepotError::storage(format!("injected delete failure for {}/{}", store, path)));
        }

        let mut content = self.content.lock().unwrap_or_else(|e| e.into_inner());
        Ok(content
            .get_mut(store)
            .is_some_and(|items| items.remove(&path).is_some()))
    }
}

/// Stream wrapper that keeps the open-handle count honest
struct CountedHandle<R> {
    inner: R,
    open_handles: Arc<AtomicUsize>,
}

impl<R: AsyncRead + Unpin> AsyncRead for CountedHandle<R> {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<R> Drop for CountedHandle<R> {
    fn drop(&mut self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

struct FailingReader;

impl AsyncRead for FailingReader {
    fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::other("injected read failure")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreType;

    fn hosted(name: &str) -> StoreKey {
        StoreKey::new("maven", StoreType::Hosted, name).unwrap()
    }

    #[tokio::test]
    async fn store_and_read_back() {
        let storage = MemoryStorage::new();
        let key = hosted("a");

        let transfer = storage.write_bytes(&key, "/org/x.jar", b"jar".to_vec()).await.unwrap();
        assert_eq!(transfer.path(), "org/x.jar");

        let reference = storage.storage_reference(&key, "org/x.jar").await.unwrap();
        assert!(reference.exists());
        assert_eq!(storage.read_bytes(&reference).await.unwrap(), b"jar");
        assert_eq!(storage.open_handles(), 0);
    }

    #[tokio::test]
    async fn list_is_scoped_to_root() {
        let storage = MemoryStorage::new();
        let key = hosted("a");
        storage.put(&key, "org/x.jar", "x");
        storage.put(&key, "org/y.jar", "y");
        storage.put(&key, "com/z.jar", "z");
        storage.put(&hosted("b"), "org/other.jar", "o");

        let all = storage.list_recursively(&key, "/").await.unwrap();
        assert_eq!(all.len(), 3);

        let org: Vec<String> = storage
            .list_recursively(&key, "org")
            .await
            .unwrap()
            .iter()
            .map(|t| t.path().to_string())
            .collect();
        assert_eq!(org, vec!["org/x.jar", "org/y.jar"]);
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let storage = MemoryStorage::new();
        let key = hosted("a");
        storage.put(&key, "x.jar", "x");

        assert!(storage.delete(&key, "x.jar").await.unwrap());
        assert!(!storage.delete(&key, "x.jar").await.unwrap());
    }

    #[tokio::test]
    async fn injected_read_fault_releases_handle() {
        let storage = MemoryStorage::new();
        let key = hosted("a");
        storage.put(&key, "x.jar", "x");
        storage.inject_fault(FaultOp::Read, &key, "x.jar", 1);

        let reference = storage.storage_reference(&key, "x.jar").await.unwrap();
        assert!(storage.read_bytes(&reference).await.is_err());
        assert_eq!(storage.open_handles(), 0);

        assert_eq!(storage.read_bytes(&reference).await.unwrap(), b"x");
    }

    #[tokio::test]
    async fn injected_write_fault_is_consumed() {
        let storage = MemoryStorage::new();
        let key = hosted("a");
        storage.inject_fault(FaultOp::Write, &key, "x.jar", 1);

        assert!(storage.write_bytes(&key, "x.jar", b"1".to_vec()).await.is_err());
        assert!(storage.write_bytes(&key, "x.jar", b"1".to_vec()).await.is_ok());
    }
}
