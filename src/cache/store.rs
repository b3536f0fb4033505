//! Persisted response cache
//!
//! The whole cache is a single JSON object on disk. It is read once when the
//! store is created, mutated in memory by any worker, and written back by
//! [`CacheStore::flush`] when at least one new entry was added.
//!
//! Writes are atomic (temp file in the same directory, then rename) and
//! coordinated with an advisory lock on `<path>.lock`.

use super::key::{CacheKey, CacheNamespace};
use fd_lock::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Default snapshot location
pub const DEFAULT_CACHE_PATH: &str = "logs/fipe_cache.json";

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, Value>,
    dirty: bool,
}

/// Thread-safe, append-only response cache backed by a JSON file
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    state: Mutex<CacheState>,
}

impl CacheStore {
    /// Load the snapshot at `path`.
    ///
    /// A missing, unreadable or malformed file yields an empty cache; the
    /// problem is logged and never propagated.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_snapshot(&path) {
            Ok(Some(entries)) => {
                info!(
                    path = %path.display(),
                    entries = entries.len(),
                    "Loaded cache snapshot"
                );
                entries
            }
            Ok(None) => {
                debug!(path = %path.display(), "No cache snapshot found, starting empty");
                HashMap::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unusable cache snapshot");
                HashMap::new()
            }
        };

        Self {
            path,
            state: Mutex::new(CacheState {
                entries,
                dirty: false,
            }),
        }
    }

    /// Snapshot location
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        // A panic while holding the lock cannot leave the map half-written,
        // so a poisoned lock is still safe to use.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Look up a memoized response
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        self.state().entries.get(&key.to_string()).cloned()
    }

    /// Memoize a response.
    ///
    /// Existing entries are never overwritten. Returns `true` if the entry was
    /// added, in which case the store becomes dirty.
    pub fn set(&self, key: &CacheKey, value: Value) -> bool {
        let mut state = self.state();
        let raw = key.to_string();
        if state.entries.contains_key(&raw) {
            return false;
        }
        state.entries.insert(raw, value);
        state.dirty = true;
        true
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether entries were added since the last flush
    pub fn is_dirty(&self) -> bool {
        self.state().dirty
    }

    /// Per-namespace entry counts
    pub fn stats(&self) -> CacheStats {
        let state = self.state();
        let mut by_namespace = BTreeMap::new();
        for key in state.entries.keys() {
            *by_namespace.entry(CacheNamespace::of_raw(key)).or_insert(0) += 1;
        }
        CacheStats {
            total: state.entries.len(),
            by_namespace,
        }
    }

    /// Write the entire map back to disk.
    ///
    /// No-op returning `Ok(false)` when nothing was added since the last flush.
    /// Missing parent directories are created. On failure the store stays
    /// dirty so a later flush can retry.
    pub fn flush(&self) -> Result<bool, CacheError> {
        let snapshot: BTreeMap<String, Value> = {
            let mut state = self.state();
            if !state.dirty {
                debug!(path = %self.path.display(), "Cache clean, skipping flush");
                return Ok(false);
            }
            state.dirty = false;
            state
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };

        match write_snapshot(&self.path, &snapshot) {
            Ok(()) => {
                info!(
                    path = %self.path.display(),
                    entries = snapshot.len(),
                    "Cache flushed"
                );
                Ok(true)
            }
            Err(e) => {
                self.state().dirty = true;
                Err(e)
            }
        }
    }

    /// Delete the snapshot at `path`. Returns `true` if a file was removed.
    pub fn clear(path: &Path) -> Result<bool, CacheError> {
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(path).map_err(|e| CacheError::Io(e.to_string()))?;
        let lock_path = path.with_extension("lock");
        if lock_path.exists() {
            let _ = std::fs::remove_file(lock_path);
        }
        info!(path = %path.display(), "Cache snapshot deleted");
        Ok(true)
    }
}

/// Entry counts reported by [`CacheStore::stats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// All entries
    pub total: usize,
    /// Entries per namespace
    pub by_namespace: BTreeMap<CacheNamespace, usize>,
}

impl CacheStats {
    /// Entries in one namespace
    pub fn count(&self, namespace: CacheNamespace) -> usize {
        self.by_namespace.get(&namespace).copied().unwrap_or(0)
    }
}

fn read_snapshot(path: &Path) -> Result<Option<HashMap<String, Value>>, CacheError> {
    if !path.exists() {
        return Ok(None);
    }

    let lock_path = path.with_extension("lock");
    let lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| CacheError::Lock(format!("Failed to open lock file: {e}")))?;
    let lock = RwLock::new(lock_file);
    let _guard = lock
        .read()
        .map_err(|e| CacheError::Lock(format!("Failed to acquire read lock: {e}")))?;

    let contents = std::fs::read_to_string(path).map_err(|e| CacheError::Load(e.to_string()))?;
    let entries: HashMap<String, Value> =
        serde_json::from_str(&contents).map_err(|e| CacheError::Load(e.to_string()))?;
    Ok(Some(entries))
}

fn write_snapshot(path: &Path, snapshot: &BTreeMap<String, Value>) -> Result<(), CacheError> {
    let parent_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent_dir).map_err(|e| CacheError::Io(e.to_string()))?;

    let json =
        serde_json::to_string(snapshot).map_err(|e| CacheError::Serialization(e.to_string()))?;

    let lock_path = path.with_extension("lock");
    let lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| CacheError::Lock(format!("Failed to create lock file: {e}")))?;
    let mut lock = RwLock::new(lock_file);
    let _guard = lock
        .write()
        .map_err(|e| CacheError::Lock(format!("Failed to acquire write lock: {e}")))?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)
        .map_err(|e| CacheError::Io(format!("Failed to create temp file: {e}")))?;
    temp_file
        .write_all(json.as_bytes())
        .map_err(|e| CacheError::Io(format!("Failed to write temp file: {e}")))?;
    temp_file
        .flush()
        .map_err(|e| CacheError::Io(format!("Failed to flush temp file: {e}")))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| CacheError::Io(format!("Failed to sync temp file: {e}")))?;
    temp_file
        .persist(path)
        .map_err(|e| CacheError::Io(format!("Failed to persist temp file: {e}")))?;

    Ok(())
}

/// Cache errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Snapshot unreadable or not a JSON object
    #[error("cache load error: {0}")]
    Load(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Lock error
    #[error("lock error: {0}")]
    Lock(String),
}
