//! Local filesystem history backend.
//!
//! The history lives in a single JSON file. Writes go to a sibling temp file
//! first and are renamed over the original, so a crash never leaves a
//! half-written history behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::{HistoryEntry, HistoryStorage, HistoryStore};

/// JSON file history backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    /// Create a backend for the given history file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Read bytes, returning None if the file doesn't exist.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read the raw entries currently on disk.
    async fn read_entries(&self) -> Result<BTreeMap<String, HistoryEntry>> {
        match self.read_bytes().await? {
            Some(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl HistoryStorage for LocalStorage {
    async fn load(&self) -> HistoryStore {
        match self.read_entries().await {
            Ok(entries) => {
                log::debug!(
                    "Loaded history for {} sources from {}",
                    entries.len(),
                    self.path.display()
                );
                HistoryStore::from_entries(entries)
            }
            Err(e) => {
                log::warn!(
                    "History at {} is unreadable ({}); starting empty",
                    self.path.display(),
                    e
                );
                HistoryStore::default()
            }
        }
    }

    async fn persist(&self, store: &HistoryStore) -> Result<bool> {
        if !store.is_dirty() {
            log::info!("History unchanged; nothing to write");
            return Ok(false);
        }

        // Load-merge-write: sources this run did not touch keep their on-disk state.
        let on_disk = self.read_entries().await.unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable history while merging: {}", e);
            BTreeMap::new()
        });
        let merged = store.merged_onto(on_disk);

        let bytes = serde_json::to_vec_pretty(&merged)?;
        self.write_bytes(&bytes).await?;
        log::info!(
            "History written to {} ({} sources changed)",
            self.path.display(),
            store.dirty_sources().count()
        );
        Ok(true)
    }
}
