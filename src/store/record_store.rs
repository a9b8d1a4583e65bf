use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use uuid::Uuid;

use super::StoreError;
use crate::models::StorageKey;

/// Patient records as `{data_dir}/{key}.json`.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// reader never observes a half-written record.
#[derive(Debug, Clone)]
pub struct RecordStore {
    data_dir: PathBuf,
}

impl RecordStore {
    /// Open a store rooted at `data_dir`, creating the directory if needed.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .map_err(|source| StoreError::Io {
                path: data_dir.clone(),
                source,
            })?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn record_path(&self, key: &StorageKey) -> PathBuf {
        self.data_dir.join(key.file_name())
    }

    /// Write `data` under `key`, replacing any existing record.
    pub async fn store(&self, key: &StorageKey, data: &Value) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(data).map_err(|source| StoreError::Serialize {
            key: key.clone(),
            source,
        })?;

        let path = self.record_path(key);
        let staging = self
            .data_dir
            .join(format!(".{}.{}.tmp", key, Uuid::new_v4().simple()));

        if let Err(source) = tokio::fs::write(&staging, &bytes).await {
            return Err(StoreError::Io {
                path: staging,
                source,
            });
        }
        if let Err(source) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(StoreError::Io { path, source });
        }

        tracing::debug!(key = %key, bytes = bytes.len(), "Record stored");
        Ok(())
    }

    /// Read the record for `key`. `Ok(None)` when no record exists.
    pub async fn get(&self, key: &StorageKey) -> Result<Option<Value>, StoreError> {
        let path = self.record_path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Parse { path, source })
    }

    /// Remove the record for `key`. Deleting a missing record is an error.
    pub async fn delete(&self, key: &StorageKey) -> Result<(), StoreError> {
        let path = self.record_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(key = %key, "Record deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(key.clone())),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}
