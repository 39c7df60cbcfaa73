//! Persistence backends for scan history.
//!
//! A backend only loads and replaces the whole record list. Ordering and
//! capacity are enforced by [`super::HistoryStore`], so they hold whichever
//! medium sits underneath.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::PersistenceError;
use crate::scan::ScanRecord;

/// Durable storage for the bounded record list.
#[async_trait]
pub trait HistoryBackend: Send + Sync {
    /// Load every stored record. An empty store yields an empty list.
    async fn load(&self) -> Result<Vec<ScanRecord>, PersistenceError>;

    /// Replace the stored list. Readers must see either the old or the new
    /// list, never a mix.
    async fn store(&self, records: &[ScanRecord]) -> Result<(), PersistenceError>;
}

/// Flat JSON file, replaced atomically via write-to-temp and rename.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

#[async_trait]
impl HistoryBackend for JsonFileBackend {
    async fn load(&self) -> Result<Vec<ScanRecord>, PersistenceError> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(PersistenceError::Io(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if data.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&data).map_err(|e| {
            PersistenceError::Corrupt(format!("{}: {}", self.path.display(), e))
        })
    }

    async fn store(&self, records: &[ScanRecord]) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    PersistenceError::Io(format!("failed to create history dir: {e}"))
                })?;
            }
        }

        let mut json = serde_json::to_string_pretty(records)
            .map_err(|e| PersistenceError::Serialize(e.to_string()))?;
        json.push('\n');

        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| PersistenceError::Io(format!("failed to write history: {e}")))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| PersistenceError::Io(format!("failed to replace history: {e}")))?;

        Ok(())
    }
}

/// Process-local backend, mostly for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: RwLock<Vec<ScanRecord>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryBackend for MemoryBackend {
    async fn load(&self) -> Result<Vec<ScanRecord>, PersistenceError> {
        Ok(self.records.read().clone())
    }

    async fn store(&self, records: &[ScanRecord]) -> Result<(), PersistenceError> {
        *self.records.write() = records.to_vec();
        Ok(())
    }
}
