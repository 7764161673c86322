//! JSON file helpers shared by the file-backed stores
//!
//! Writes go to a sibling `*.tmp` file first and are renamed into place, so a
//! crash mid-write never leaves a truncated record behind.

use crate::error::{StoreError, StoreResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> StoreResult<()> {
    let content = serde_json::to_string_pretty(value)?;
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> StoreResult<()> {
        let tmp_path = path.with_extension("json.tmp");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
        }
        std::fs::write(&tmp_path, content).map_err(|source| {
            tracing::error!(path = ?tmp_path, error = %source, "Failed to write temp file");
            io_error(&tmp_path, source)
        })?;
        std::fs::rename(&tmp_path, &path).map_err(|source| {
            tracing::error!(from = ?tmp_path, to = ?path, error = %source, "Failed to rename into place");
            io_error(&path, source)
        })?;
        tracing::debug!(path = ?path, "Persisted record");
        Ok(())
    })
    .await
    .map_err(|e| StoreError::Join(e.to_string()))?
}

/// Read a JSON record, returning `None` when the file does not exist
pub async fn read_json<T: DeserializeOwned + Send + 'static>(path: &Path) -> StoreResult<Option<T>> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> StoreResult<Option<T>> {
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(io_error(&path, source)),
        }
    })
    .await
    .map_err(|e| StoreError::Join(e.to_string()))?
}

pub async fn remove_file(path: &Path) -> StoreResult<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> StoreResult<()> {
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(io_error(&path, source)),
        }
    })
    .await
    .map_err(|e| StoreError::Join(e.to_string()))?
}

/// Every `*.json` file directly inside `dir`; an absent directory is empty
pub async fn list_json_files(dir: &Path) -> StoreResult<Vec<PathBuf>> {
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || -> StoreResult<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(io_error(&dir, source)),
        };
        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        Ok(files)
    })
    .await
    .map_err(|e| StoreError::Join(e.to_string()))?
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}
