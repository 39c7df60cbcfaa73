//! Scan history
//!
//! A bounded, newest-first list of [`ScanRecord`]s that survives across
//! sessions. The store assigns `id` and `timestamp` on save and keeps only
//! the most recent `capacity` records, evicting the oldest on every save.
//!
//! Saves are serialized, and the backend replaces the list in one step, so a
//! record becomes visible to [`HistoryStore::list`] only once it is fully
//! written.

pub mod backend;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::scan::{NewScan, ScanRecord};

pub use backend::{HistoryBackend, JsonFileBackend, MemoryBackend};

/// Number of records kept by default.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Errors from the history store.
#[derive(Error, Debug, Clone)]
pub enum PersistenceError {
    #[error("history I/O error: {0}")]
    Io(String),

    #[error("failed to serialize history: {0}")]
    Serialize(String),

    #[error("history file is corrupt: {0}")]
    Corrupt(String),
}

/// Bounded, newest-first scan history.
pub struct HistoryStore {
    backend: Arc<dyn HistoryBackend>,
    capacity: usize,
    write_lock: tokio::sync::Mutex<()>,
}

impl HistoryStore {
    /// Create a store over `backend` keeping at most `capacity` records
    /// (at least one).
    pub fn new(backend: Arc<dyn HistoryBackend>, capacity: usize) -> Self {
        Self {
            backend,
            capacity: capacity.max(1),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// In-memory store, nothing persisted.
    pub fn in_memory(capacity: usize) -> Self {
        Self::new(Arc::new(MemoryBackend::new()), capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Persist a new record and return it with its assigned id and timestamp.
    pub async fn save(&self, scan: NewScan) -> Result<ScanRecord, PersistenceError> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.backend.load().await?;
        let record = ScanRecord::from_new(scan, Uuid::new_v4(), save_timestamp(&records));

        records.insert(0, record.clone());
        sort_newest_first(&mut records);
        let before = records.len();
        records.truncate(self.capacity);

        self.backend.store(&records).await?;

        tracing::info!(
            record_id = %record.id,
            filename = %record.filename,
            status = %record.status,
            capacity = self.capacity,
            evicted = before - records.len(),
            "Scan saved to history"
        );

        Ok(record)
    }

    /// All retained records, newest first.
    pub async fn list(&self) -> Result<Vec<ScanRecord>, PersistenceError> {
        let mut records = self.backend.load().await?;
        sort_newest_first(&mut records);
        records.truncate(self.capacity);
        Ok(records)
    }

    /// Look up a single retained record.
    pub async fn get(&self, id: Uuid) -> Result<Option<ScanRecord>, PersistenceError> {
        Ok(self.list().await?.into_iter().find(|r| r.id == id))
    }
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Current time, but never older than any retained record, so a wall clock
/// stepping backwards cannot sort the new record behind the rest and evict it.
fn save_timestamp(records: &[ScanRecord]) -> DateTime<Utc> {
    let now = Utc::now();
    records
        .iter()
        .map(|r| r.timestamp)
        .max()
        .map_or(now, |newest| newest.max(now))
}

/// Stable sort by timestamp descending; equal timestamps keep list order,
/// which puts the most recently inserted first.
fn sort_newest_first(records: &mut [ScanRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
