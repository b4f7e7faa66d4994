//! Snapshot persistence backends.
//!
//! The store writes the whole registry after every mutation through the
//! [`SnapshotStore`] trait. Two backends are provided:
//!
//! - [`JsonFileStore`]: a JSON file written atomically (temp file + rename)
//! - [`MemoryStore`]: shared in-memory JSON, used by tests to simulate
//!   process restarts and failing disks

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use super::error::PersistenceError;
use crate::types::Snapshot;

/// Durable key-value capability holding the timer snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Loads the last saved snapshot, or `None` if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read or parsed.
    fn load(&self) -> Result<Option<Snapshot>, PersistenceError>;

    /// Replaces the saved snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError>;
}

// ============================================================================
// JsonFileStore
// ============================================================================

/// Snapshot stored as a pretty-printed JSON object in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store backed by `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn companion_path(&self, suffix: &str) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("timers.json");
        self.path.with_file_name(format!("{file_name}{suffix}"))
    }

    /// Moves an unparseable snapshot aside so the next save does not destroy it.
    fn quarantine(&self) -> Option<PathBuf> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let target = self.companion_path(&format!(".corrupt-{millis}"));
        match fs::rename(&self.path, &target) {
            Ok(()) => Some(target),
            Err(e) => {
                warn!("Failed to quarantine corrupt snapshot {:?}: {}", self.path, e);
                None
            }
        }
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<Snapshot>, PersistenceError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No snapshot at {:?}", self.path);
                return Ok(None);
            }
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if contents.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str::<Snapshot>(&contents) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                let moved = self.quarantine();
                let detail = match moved {
                    Some(target) => format!("{e}; moved to {}", target.display()),
                    None => e.to_string(),
                };
                Err(PersistenceError::Corrupt(detail))
            }
        }
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        let write_err = |source| PersistenceError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        let temp_path = self.companion_path(".tmp");
        write_synced(&temp_path, json.as_bytes()).map_err(write_err)?;
        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(write_err(e));
        }
        Ok(())
    }
}

/// Writes `bytes` and flushes them to disk before returning, so a rename
/// never publishes an empty file after a crash.
fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory snapshot store.
///
/// Clones share the same contents, so a test can hand one clone to a store,
/// drop the store, and open a new one on another clone to simulate a
/// restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    contents: Arc<Mutex<Option<String>>>,
    fail_writes: Arc<AtomicBool>,
    save_count: Arc<AtomicUsize>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with raw JSON (which may be invalid).
    #[must_use]
    pub fn with_contents(json: impl Into<String>) -> Self {
        let store = Self::new();
        *store.contents.lock().unwrap_or_else(|e| e.into_inner()) = Some(json.into());
        store
    }

    /// Returns the raw JSON last saved.
    #[must_use]
    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Makes every subsequent save fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<Snapshot>, PersistenceError> {
        let Some(json) = self.contents() else {
            return Ok(None);
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| PersistenceError::Corrupt(e.to_string()))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("writes disabled".to_string()));
        }
        let json = serde_json::to_string(snapshot)?;
        *self.contents.lock().unwrap_or_else(|e| e.into_inner()) = Some(json);
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
