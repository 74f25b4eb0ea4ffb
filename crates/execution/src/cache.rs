//! Result cache keyed by canonical graph form.
//!
//! Entries live in memory behind a mutex and are mirrored to a JSON file
//! that is loaded once at construction and rewritten in full on every put.
//! Mirroring is best-effort: a failed write is logged and the entry stays
//! cached in memory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tda_core::ResolutionResult;
use tracing::{debug, warn};

/// Errors from the on-disk mirror.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Memoized resolution results.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: Mutex<BTreeMap<String, ResolutionResult>>,
    path: Option<PathBuf>,
}

impl ResultCache {
    /// Create a cache with no file mirror.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a cache mirrored to `path`.
    ///
    /// A missing, unreadable or corrupt file yields an empty cache.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match load(&path) {
            Ok(entries) => {
                debug!("Loaded {} cached results from {}", entries.len(), path.display());
                entries
            }
            Err(CacheError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("Ignoring unreadable cache file {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };

        Self {
            entries: Mutex::new(entries),
            path: Some(path),
        }
    }

    /// Location of the file mirror, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Look up a previously stored result.
    pub fn get(&self, key: &str) -> Option<ResolutionResult> {
        self.lock().get(key).cloned()
    }

    /// Store a result and rewrite the file mirror.
    ///
    /// The entry is always kept in memory. Returns `false` when the mirror
    /// could not be written, `true` otherwise.
    ///
    /// The mirror is written with blocking file I/O while the lock is held.
    pub fn put(&self, key: String, result: ResolutionResult) -> bool {
        let mut entries = self.lock();
        entries.insert(key, result);

        let Some(path) = &self.path else {
            return true;
        };
        match persist(path, &entries) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to persist result cache to {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Number of cached results.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, ResolutionResult>> {
        // A panic mid-insert cannot leave the map half-written
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load(path: &Path) -> Result<BTreeMap<String, ResolutionResult>, CacheError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn persist(path: &Path, entries: &BTreeMap<String, ResolutionResult>) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(entries)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json.as_bytes())?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
