//! Filesystem content storage
//!
//! Layout: `{root}/{packageType}/{storeType}/{name}/{path}`. Writes go to a
//! temporary sibling file and are renamed into place.

use crate::content::storage::{is_under, normalize_path, ContentStorage, ContentStream, Transfer};
use crate::error::{DepotError, DepotResult};
use crate::store::StoreKey;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, trace};
use uuid::Uuid;

/// Content storage rooted at a local directory
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a store's content
    pub fn store_dir(&self, store: &StoreKey) -> PathBuf {
        self.root
            .join(store.package_type())
            .join(store.store_type().as_str())
            .join(store.name())
    }

    fn file_path(&self, store: &StoreKey, path: &str) -> PathBuf {
        let mut file = self.store_dir(store);
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            file.push(segment);
        }
        file
    }
}

#[async_trait]
impl ContentStorage for FileStorage {
    async fn list_recursively(&self, store: &StoreKey, root: &str) -> DepotResult<Vec<Transfer>> {
        let root = normalize_path(root)?;
        let base = self.store_dir(store);
        let start = self.file_path(store, &root);

        let mut found = Vec::new();
        let mut dirs = vec![start];

        while let Some(dir) = dirs.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(_) if !dir.is_dir() => continue,
                Err(e) => return Err(DepotError::io(format!("listing {}", dir.display()), e)),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| DepotError::io(format!("reading entry in {}", dir.display()), e))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| DepotError::io(format!("inspecting {}", path.display()), e))?;

                if file_type.is_dir() {
                    dirs.push(path);
                } else if file_type.is_file() && !is_temp_file(&path) {
                    if let Some(relative) = relative_content_path(&base, &path) {
                        if is_under(&relative, &root) {
                            found.push(Transfer::new(store.clone(), relative, true));
                        }
                    }
                }
            }
        }

        found.sort_by(|a, b| a.path().cmp(b.path()));
        trace!("Listed {} item(s) under {}/{}", found.len(), store, root);
        Ok(found)
    }

    async fn storage_reference(&self, store: &StoreKey, path: &str) -> DepotResult<Transfer> {
        let path = normalize_path(path)?;
        let file = self.file_path(store, &path);
        let exists = match fs::metadata(&file).await {
            Ok(meta) => meta.is_file(),
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(DepotError::io(format!("inspecting {}", file.display()), e)),
        };
        Ok(Transfer::new(store.clone(), path, exists))
    }

    async fn open(&self, transfer: &Transfer) -> DepotResult<ContentStream> {
        let file = self.file_path(transfer.store(), transfer.path());
        match fs::File::open(&file).await {
            Ok(handle) => Ok(Box::new(handle)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(DepotError::ContentNotFound {
                store: transfer.store().clone(),
                path: transfer.path().to_string(),
            }),
            Err(e) => Err(DepotError::io(format!("opening {}", file.display()), e)),
        }
    }

    async fn store(&self, store: &StoreKey, path: &str, mut stream: ContentStream) -> DepotResult<Transfer> {
        let path = normalize_path(path)?;
        if path.is_empty() {
            return Err(DepotError::PathInvalid {
                path,
                reason: "cannot store content at the store root".to_string(),
            });
        }

        let file = self.file_path(store, &path);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DepotError::io(format!("creating directory {}", parent.display()), e))?;
        }

        let temp = temp_path(&file);
        let result = async {
            let mut out = fs::File::create(&temp)
                .await
                .map_err(|e| DepotError::io(format!("creating {}", temp.display()), e))?;
            tokio::io::copy(&mut stream, &mut out)
                .await
                .map_err(|e| DepotError::io(format!("writing {}", temp.display()), e))?;
            out.sync_all()
                .await
                .map_err(|e| DepotError::io(format!("syncing {}", temp.display()), e))?;
            fs::rename(&temp, &file)
                .await
                .map_err(|e| DepotError::io(format!("renaming into {}", file.display()), e))
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&temp).await;
        }
        result?;

        debug!("Stored {}/{}", store, path);
        Ok(Transfer::new(store.clone(), path, true))
    }

    async fn delete(&self, store: &StoreKey, path: &str) -> DepotResult<bool> {
        let path = normalize_path(path)?;
        let file = self.file_path(store, &path);
        match fs::remove_file(&file).await {
            Ok(()) => {
                debug!("Deleted {}/{}", store, path);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DepotError::io(format!("deleting {}", file.display()), e)),
        }
    }
}

const TEMP_MARKER: &str = ".depot-tmp-";

fn temp_path(file: &Path) -> PathBuf {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    file.with_file_name(format!("{}{}{}", name, TEMP_MARKER, Uuid::new_v4()))
}

fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().contains(TEMP_MARKER))
}

fn relative_content_path(base: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(base).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    Some(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreType;
    use tempfile::TempDir;

    fn hosted(name: &str) -> StoreKey {
        StoreKey::new("maven", StoreType::Hosted, name).unwrap()
    }

    #[tokio::test]
    async fn store_lays_out_by_key() {
        let temp = TempDir::new().unwrap();
        let storage = FileStorage::new(temp.path());
        let key = hosted("local");

        storage
            .write_bytes(&key, "/org/foo/1.0/foo-1.0.jar", b"jar".to_vec())
            .await
            .unwrap();

        let expected = temp.path().join("maven/hosted/local/org/foo/1.0/foo-1.0.jar");
        assert_eq!(std::fs::read(expected).unwrap(), b"jar");
    }

    #[tokio::test]
    async fn list_read_delete() {
        let temp = TempDir::new().unwrap();
        let storage = FileStorage::new(temp.path());
        let key = hosted("local");

        storage.write_bytes(&key, "b/y.jar", b"y".to_vec()).await.unwrap();
        storage.write_bytes(&key, "a/x.jar", b"x".to_vec()).await.unwrap();
        storage.write_bytes(&hosted("other"), "a/z.jar", b"z".to_vec()).await.unwrap();

        let listed: Vec<String> = storage
            .list_recursively(&key, "/")
            .await
            .unwrap()
            .iter()
            .map(|t| t.path().to_string())
            .collect();
        assert_eq!(listed, vec!["a/x.jar", "b/y.jar"]);

        let reference = storage.storage_reference(&key, "a/x.jar").await.unwrap();
        assert_eq!(storage.read_bytes(&reference).await.unwrap(), b"x");

        assert!(storage.delete(&key, "a/x.jar").await.unwrap());
        assert!(!storage.delete(&key, "a/x.jar").await.unwrap());
        assert!(!storage.storage_reference(&key, "a/x.jar").await.unwrap().exists());
    }

    #[tokio::test]
    async fn missing_store_lists_empty() {
        let temp = TempDir::new().unwrap();
        let storage = FileStorage::new(temp.path());
        assert!(storage.list_recursively(&hosted("nope"), "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn digest_uses_content() {
        let temp = TempDir::new().unwrap();
        let storage = FileStorage::new(temp.path());
        let key = hosted("local");
        storage.write_bytes(&key, "x.txt", b"abc".to_vec()).await.unwrap();

        let digests = storage
            .digest(&key, "x.txt", &[crate::content::ContentDigest::Md5])
            .await
            .unwrap();
        assert_eq!(
            digests[&crate::content::ContentDigest::Md5],
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }
}
