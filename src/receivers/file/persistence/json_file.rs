// SPDX-License-Identifier: Apache-2.0

//! JSON file-based completion marker store with atomic writes.
//!
//! State is held in memory behind a shared lock and written out as a single
//! JSON document using a write-to-temp-then-rename strategy. Readers only ever
//! *request* a flush; the host decides when to pay for the disk write.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering as FlagOrdering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::receivers::file::error::{Error, Result};
use crate::receivers::file::input::FileId;

use super::schema::{
    CompletionMarker, PERSISTED_STATE_VERSION, PersistedFileEntryV1, PersistedStateV1,
};
use super::store::PositionStore;

/// A shared JSON file database handle. Clones see the same state.
#[derive(Clone)]
pub struct JsonFileDatabase {
    path: PathBuf,
    state: Arc<RwLock<PersistedStateV1>>,
    flush_requested: Arc<AtomicBool>,
}

impl JsonFileDatabase {
    /// Open or create a database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let state = if path.exists() {
            let file = File::open(&path)
                .map_err(|e| Error::Persistence(format!("failed to open database: {}", e)))?;
            let state: PersistedStateV1 = serde_json::from_reader(BufReader::new(file))
                .map_err(|e| Error::Persistence(format!("failed to parse database: {}", e)))?;
            if state.version != PERSISTED_STATE_VERSION {
                return Err(Error::Persistence(format!(
                    "unsupported database version {} (expected {})",
                    state.version, PERSISTED_STATE_VERSION
                )));
            }
            state
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent).map_err(|e| {
                        Error::Persistence(format!("failed to create database directory: {}", e))
                    })?;
                }
            }
            PersistedStateV1::default()
        };

        debug!(
            path = %path.display(),
            entries = state.files.len(),
            "Opened completion marker database"
        );

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(state)),
            flush_requested: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Create an in-memory database (useful for testing)
    pub fn open_memory() -> Self {
        Self {
            path: PathBuf::new(),
            state: Arc::new(RwLock::new(PersistedStateV1::default())),
            flush_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_flush_requested(&self) -> bool {
        self.flush_requested.load(FlagOrdering::Acquire)
    }

    /// Write to disk only if some reader asked for it since the last write.
    /// Returns whether a write happened.
    pub fn flush_if_requested(&self) -> Result<bool> {
        if !self.flush_requested.swap(false, FlagOrdering::AcqRel) {
            return Ok(false);
        }

        if let Err(e) = self.flush() {
            // Keep the request pending so the next attempt retries
            self.flush_requested.store(true, FlagOrdering::Release);
            return Err(e);
        }
        Ok(true)
    }

    /// Write all state to disk unconditionally
    pub fn flush(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Ok(()); // In-memory mode, nothing to flush
        }

        let state = self
            .state
            .read()
            .map_err(|e| Error::Persistence(e.to_string()))?;

        atomic_write(&self.path, &state)
    }

    /// Full entry for an archive, including its last known path.
    pub fn entry(&self, key: &FileId) -> Option<PersistedFileEntryV1> {
        self.read_state().files.get(&key.key()).cloned()
    }

    pub fn len(&self) -> usize {
        self.read_state().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Store accessors are infallible; a poisoned lock still holds consistent
    // map data since every write is a single insert.
    fn read_state(&self) -> RwLockReadGuard<'_, PersistedStateV1> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, PersistedStateV1> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PositionStore for JsonFileDatabase {
    fn exists(&self, key: &FileId) -> bool {
        self.read_state().files.contains_key(&key.key())
    }

    fn get(&self, key: &FileId) -> Option<CompletionMarker> {
        self.read_state().files.get(&key.key()).map(|e| e.marker)
    }

    fn put(&mut self, key: &FileId, marker: CompletionMarker) {
        let mut state = self.write_state();
        let entry = state
            .files
            .entry(key.key())
            .or_insert_with(|| new_entry(key, None));
        entry.marker = entry.marker.advance(marker);
    }

    fn register(&mut self, key: &FileId, path: &Path) {
        self.write_state()
            .files
            .entry(key.key())
            .or_insert_with(|| new_entry(key, Some(path)));
    }

    fn request_flush(&self) {
        self.flush_requested.store(true, FlagOrdering::Release);
    }
}

fn new_entry(key: &FileId, path: Option<&Path>) -> PersistedFileEntryV1 {
    PersistedFileEntryV1 {
        path: path.map(|p| p.display().to_string()).unwrap_or_default(),
        filename: path
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        dev: key.dev(),
        ino: key.ino(),
        marker: CompletionMarker::Unset,
    }
}

/// Write state to file atomically (write to temp, then rename)
fn atomic_write(path: &Path, state: &PersistedStateV1) -> Result<()> {
    use portable_atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Persistence(format!("failed to create parent directory: {}", e))
            })?;
        }
    }

    // Process ID + counter keeps concurrent flushes off each other's temp file
    let unique_id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let temp_path = path.with_extension(format!("tmp.{}.{}", std::process::id(), unique_id));

    let file = File::create(&temp_path)
        .map_err(|e| Error::Persistence(format!("failed to create temp file: {}", e)))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, state)
        .map_err(|e| Error::Persistence(format!("failed to write database: {}", e)))?;

    use std::io::Write;
    writer
        .flush()
        .map_err(|e| Error::Persistence(format!("failed to flush database: {}", e)))?;
    drop(writer);

    fs::rename(&temp_path, path)
        .map_err(|e| Error::Persistence(format!("failed to rename database file: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_then_complete() {
        let mut db = JsonFileDatabase::open_memory();
        let key = FileId::new(1, 100);

        assert!(!db.exists(&key));
        assert_eq!(db.get(&key), None);

        db.register(&key, Path::new("/var/log/app.log.1.gz"));
        assert!(db.exists(&key));
        assert_eq!(db.get(&key), Some(CompletionMarker::Unset));

        let entry = db.entry(&key).unwrap();
        assert_eq!(entry.filename, "app.log.1.gz");
        assert_eq!(entry.key(), "1:100");

        db.put(&key, CompletionMarker::Complete(512));
        assert_eq!(db.get(&key), Some(CompletionMarker::Complete(512)));
    }

    #[test]
    fn test_register_keeps_existing_marker() {
        let mut db = JsonFileDatabase::open_memory();
        let key = FileId::new(1, 100);

        db.put(&key, CompletionMarker::Complete(512));
        db.register(&key, Path::new("/var/log/renamed.gz"));

        assert_eq!(db.get(&key), Some(CompletionMarker::Complete(512)));
    }

    #[test]
    fn test_put_never_decrements() {
        let mut db = JsonFileDatabase::open_memory();
        let key = FileId::new(1, 100);

        db.put(&key, CompletionMarker::Complete(512));
        db.put(&key, CompletionMarker::Complete(10));
        db.put(&key, CompletionMarker::Unset);

        assert_eq!(db.get(&key), Some(CompletionMarker::Complete(512)));
    }

    #[test]
    fn test_clones_share_state() {
        let mut db = JsonFileDatabase::open_memory();
        let other = db.clone();
        let key = FileId::new(3, 7);

        db.register(&key, Path::new("/tmp/x.gz"));
        db.request_flush();

        assert!(other.exists(&key));
        assert!(other.is_flush_requested());
    }

    #[test]
    fn test_flush_if_requested() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("state").join("offsets.json");

        let mut db = JsonFileDatabase::open(&db_path).unwrap();
        db.register(&FileId::new(1, 2), Path::new("/tmp/a.gz"));

        // Nothing requested yet
        assert!(!db.flush_if_requested().unwrap());
        assert!(!db_path.exists());

        db.request_flush();
        assert!(db.flush_if_requested().unwrap());
        assert!(db_path.exists());
        assert!(!db.is_flush_requested());
    }

    #[test]
    fn test_reopen_from_disk() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("offsets.json");
        let done = FileId::new(1, 100);
        let pending = FileId::new(1, 101);

        {
            let mut db = JsonFileDatabase::open(&db_path).unwrap();
            db.register(&done, Path::new("/var/log/a.gz"));
            db.put(&done, CompletionMarker::Complete(12345));
            db.register(&pending, Path::new("/var/log/b.gz"));
            db.flush().unwrap();
        }

        let db = JsonFileDatabase::open(&db_path).unwrap();
        assert_eq!(db.len(), 2);
        assert_eq!(db.get(&done), Some(CompletionMarker::Complete(12345)));
        assert_eq!(db.get(&pending), Some(CompletionMarker::Unset));
    }

    #[test]
    fn test_open_rejects_unknown_version() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("offsets.json");
        fs::write(&db_path, r#"{"version": 9, "files": {}}"#).unwrap();

        let result = JsonFileDatabase::open(&db_path);
        assert!(matches!(result, Err(Error::Persistence(_))));
    }

    #[test]
    fn test_open_rejects_garbage() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("offsets.json");
        fs::write(&db_path, "not json").unwrap();

        assert!(JsonFileDatabase::open(&db_path).is_err());
    }
}
