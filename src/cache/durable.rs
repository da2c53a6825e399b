//! Durable cache layer.
//!
//! A namespaced string key-value surface that outlives the in-memory layer
//! for the lifetime of a browsing session (or a process, for the file
//! backend). Values are serialized [`CacheEntry`](super::CacheEntry)
//! envelopes; keys are `"<kind>_<scope id>"`.
//!
//! Implementations report failures (quota, I/O) as
//! [`PaddockError::Storage`]. The [`CacheStore`](super::CacheStore) is the
//! single place those errors are logged and turned into misses.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::{PaddockError, Result};

/// String key-value storage backing the durable cache tier.
pub trait DurableStore: Send + Sync {
    /// Read a value. `Ok(None)` if the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// All keys currently stored.
    fn keys(&self) -> Result<Vec<String>>;

    /// Number of stored keys.
    fn len(&self) -> Result<usize> {
        Ok(self.keys()?.len())
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Process-local durable layer.
///
/// Survives re-creation of the volatile tier (e.g. a facade rebuilt on top
/// of the same store) but not the process. An optional byte quota rejects
/// writes the way a full browser storage area does.
#[derive(Debug, Default)]
pub struct MemoryDurableStore {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit total stored bytes (keys + values).
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| PaddockError::Storage("durable store lock poisoned".to_string()))
    }
}

impl DurableStore for MemoryDurableStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.lock()?;
        if let Some(quota) = self.quota_bytes {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = used + key.len() + value.len();
            if needed > quota {
                return Err(PaddockError::Storage(format!(
                    "quota exceeded writing '{key}': {needed} > {quota} bytes"
                )));
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }
}

// ============================================================================
// File backend
// ============================================================================

const FILE_SUFFIX: &str = ".json";

/// Directory-backed durable layer: one `<key>.json` file per entry.
///
/// Writes go to a temporary file first and are renamed into place, so a
/// reader never observes a half-written envelope.
#[derive(Debug, Clone)]
pub struct FileDurableStore {
    dir: PathBuf,
    quota_bytes: Option<u64>,
}

impl FileDurableStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            PaddockError::Storage(format!("failed to create cache dir {}: {e}", dir.display()))
        })?;
        Ok(Self {
            dir,
            quota_bytes: None,
        })
    }

    /// Limit total bytes of stored files.
    pub fn quota(mut self, bytes: u64) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }

    /// Default location: `~/.cache/paddock/session`.
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("paddock")
            .join("session")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(PaddockError::Storage(format!("invalid durable key '{key}'")));
        }
        Ok(self.dir.join(format!("{key}{FILE_SUFFIX}")))
    }

    fn used_bytes_excluding(&self, skip: &Path) -> Result<u64> {
        let mut total = 0;
        for entry in self.read_dir()? {
            let path = entry.path();
            if path == skip || !is_entry_file(&path) {
                continue;
            }
            total += entry.metadata().map(|m| m.len()).unwrap_or(0);
        }
        Ok(total)
    }

    fn read_dir(&self) -> Result<Vec<std::fs::DirEntry>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            PaddockError::Storage(format!("failed to list {}: {e}", self.dir.display()))
        })?;
        Ok(entries.filter_map(|e| e.ok()).collect())
    }
}

fn is_entry_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(FILE_SUFFIX))
}

impl DurableStore for FileDurableStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PaddockError::Storage(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(quota) = self.quota_bytes {
            let needed = self.used_bytes_excluding(&path)? + value.len() as u64;
            if needed > quota {
                return Err(PaddockError::Storage(format!(
                    "quota exceeded writing '{key}': {needed} > {quota} bytes"
                )));
            }
        }

        // Each write gets its own tmp file, so overlapping writes of one key
        // never share a half-written file before the rename.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| {
            PaddockError::Storage(format!(
                "failed to create tmp file in {}: {e}",
                self.dir.display()
            ))
        })?;
        tmp.write_all(value.as_bytes()).map_err(|e| {
            PaddockError::Storage(format!("failed to write {}: {e}", tmp.path().display()))
        })?;
        tmp.persist(&path).map_err(|e| {
            PaddockError::Storage(format!("failed to persist {}: {}", path.display(), e.error))
        })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PaddockError::Storage(format!(
                "failed to remove {}: {e}",
                path.display()
            ))),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self
            .read_dir()?
            .into_iter()
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                name.strip_suffix(FILE_SUFFIX).map(str::to_string)
            })
            .collect())
    }
}
