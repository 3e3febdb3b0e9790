//! Tracking record persistence

use crate::error::{DepotError, DepotResult};
use crate::tracking::model::{TrackedContentRecord, TrackingKey};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

/// Backing store for records evicted from the tracking cache
#[async_trait]
pub trait RecordPersistence: Send + Sync {
    /// Load a persisted record, `None` if there is none
    async fn load(&self, key: &TrackingKey) -> DepotResult<Option<TrackedContentRecord>>;

    /// Write a record, replacing any previous copy
    async fn store(&self, record: &TrackedContentRecord) -> DepotResult<()>;

    /// Whether a persisted record exists
    async fn exists(&self, key: &TrackingKey) -> DepotResult<bool>;

    /// Remove a persisted record, returning whether one existed
    async fn delete(&self, key: &TrackingKey) -> DepotResult<bool>;
}

/// One JSON file per tracking key: `<dir>/<id>.json`
pub struct FileRecordPersistence {
    dir: PathBuf,
}

impl FileRecordPersistence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self, key: &TrackingKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.id()))
    }
}

#[async_trait]
impl RecordPersistence for FileRecordPersistence {
    async fn load(&self, key: &TrackingKey) -> DepotResult<Option<TrackedContentRecord>> {
        let path = self.file_path(key);

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DepotError::io(format!("reading tracking record {}", path.display()), e)),
        };

        let mut record: TrackedContentRecord =
            serde_json::from_str(&content).map_err(|e| DepotError::TrackingRecordCorrupt {
                key: key.id().to_string(),
                reason: e.to_string(),
            })?;

        if record.key != *key {
            return Err(DepotError::TrackingRecordCorrupt {
                key: key.id().to_string(),
                reason: format!("file holds record for {}", record.key),
            });
        }
        // Keep the caller's tracked store binding
        record.key = key.clone();

        debug!("Loaded tracking record {} from {}", key, path.display());
        Ok(Some(record))
    }

    async fn store(&self, record: &TrackedContentRecord) -> DepotResult<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| DepotError::io(format!("creating tracking directory {}", self.dir.display()), e))?;

        let path = self.file_path(&record.key);
        let content = serde_json::to_string_pretty(record)?;

        // Readers see either the old file or the new one, never a partial write
        let temp = self.dir.join(format!("{}.json.tmp-{}", record.key.id(), Uuid::new_v4()));
        let result = async {
            let mut out = fs::File::create(&temp)
                .await
                .map_err(|e| DepotError::io(format!("creating {}", temp.display()), e))?;
            out.write_all(content.as_bytes())
                .await
                .map_err(|e| DepotError::io(format!("writing tracking record {}", temp.display()), e))?;
            out.sync_all()
                .await
                .map_err(|e| DepotError::io(format!("syncing {}", temp.display()), e))?;
            fs::rename(&temp, &path)
                .await
                .map_err(|e| DepotError::io(format!("renaming into {}", path.display()), e))
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&temp).await;
        }
        result?;

        debug!("Wrote tracking record {} to {}", record.key, path.display());
        Ok(())
    }

    async fn exists(&self, key: &TrackingKey) -> DepotResult<bool> {
        let path = self.file_path(key);
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DepotError::io(format!("inspecting tracking record {}", path.display()), e)),
        }
    }

    async fn delete(&self, key: &TrackingKey) -> DepotResult<bool> {
        let path = self.file_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DepotError::io(format!("deleting tracking record {}", path.display()), e)),
        }
    }
}
