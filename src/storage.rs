//! JSON snapshot files for actor state.
//!
//! Each store owns one file. Writes go to a sibling temp file first and are
//! renamed into place, so a crash mid-write leaves the previous snapshot intact.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StorageError {
    #[error("failed to read snapshot {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("failed to write snapshot {path}: {reason}")]
    Write { path: String, reason: String },
    #[error("snapshot {path} is not valid: {reason}")]
    Decode { path: String, reason: String },
    #[error("failed to encode snapshot: {0}")]
    Encode(String),
}

/// A single snapshot file on disk.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the snapshot. A missing file is not an error and yields `None`.
    ///
    /// Runs synchronously; only called during startup before the actor loop.
    pub fn load<V: DeserializeOwned>(&self) -> Result<Option<V>, StorageError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::Read {
                    path: self.display(),
                    reason: e.to_string(),
                })
            }
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Decode {
                path: self.display(),
                reason: e.to_string(),
            })
    }

    #[instrument(fields(path = %self.path.display()), skip(self, value))]
    pub async fn store<V: Serialize>(&self, value: &V) -> Result<(), StorageError> {
        let encoded =
            serde_json::to_vec_pretty(value).map_err(|e| StorageError::Encode(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.write_error(e))?;
            }
        }

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &encoded)
            .await
            .map_err(|e| self.write_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.write_error(e))?;

        debug!(bytes = encoded.len(), "Snapshot written");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_error(&self, e: std::io::Error) -> StorageError {
        StorageError::Write {
            path: self.display(),
            reason: e.to_string(),
        }
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }
}
