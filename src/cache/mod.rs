//! Two-tier dataset cache.
//!
//! [`CacheStore`] keeps normalized datasets keyed by [`CacheKey`] in two
//! layers:
//!
//! - a volatile layer: moka's in-memory cache, bounded by entry count,
//!   with per-entry expiry derived from each [`CacheEntry`];
//! - a durable layer: any [`DurableStore`], holding serialized
//!   `{data, timestamp, ttl}` envelopes under `"<kind>_<scope id>"`.
//!
//! # Lookup chain
//!
//! ```text
//! get(key) = volatile.get(key)
//!              .filter(fresh)
//!              .or_else(|| durable.get(key).filter(fresh).tap(promote to volatile))
//! ```
//!
//! Expired entries are never returned, even while physically present.
//! Eviction is lazy; [`CacheStore::sweep_expired()`] reclaims space but is
//! never needed for correctness.
//!
//! # Durable failures
//!
//! Durable read, write and parse errors are logged, counted under
//! [`telemetry::DURABLE_ERRORS_TOTAL`] and converted into misses here. They
//! never reach callers of the store.

mod durable;
mod entry;

pub use durable::{DurableStore, FileDurableStore, MemoryDurableStore};
pub use entry::CacheEntry;

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::sync::Cache;
use tracing::{debug, warn};

use crate::telemetry;
use crate::types::{CacheKey, Dataset, DatasetKind, ScopeKey, TtlClass};

/// Default time-to-live for both TTL classes: 30 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Configuration for the dataset cache.
///
/// ```rust
/// # use paddock::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(500)
///     .dynamic_ttl(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum entries held in the volatile layer. Default: 1,000.
    pub max_entries: u64,
    /// TTL for [`TtlClass::Static`] datasets. Default: 30 minutes.
    pub static_ttl: Duration,
    /// TTL for [`TtlClass::Dynamic`] datasets. Default: 30 minutes.
    pub dynamic_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            static_ttl: DEFAULT_TTL,
            dynamic_ttl: DEFAULT_TTL,
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of volatile entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the TTL for static datasets.
    pub fn static_ttl(mut self, ttl: Duration) -> Self {
        self.static_ttl = ttl;
        self
    }

    /// Set the TTL for dynamic datasets.
    pub fn dynamic_ttl(mut self, ttl: Duration) -> Self {
        self.dynamic_ttl = ttl;
        self
    }

    /// Resolve a TTL class to its configured duration.
    pub fn ttl_for(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::Static => self.static_ttl,
            TtlClass::Dynamic => self.dynamic_ttl,
        }
    }
}

/// Entry counts per layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub volatile_entries: u64,
    pub durable_entries: usize,
}

/// Lets moka drop volatile entries once their own TTL has elapsed.
struct EntryExpiry;

impl moka::Expiry<CacheKey, CacheEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.remaining())
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.remaining())
    }
}

/// Two-tier (volatile + durable) cache of normalized datasets.
///
/// Construct one per process or browsing session and share it by reference
/// (typically `Arc<CacheStore>`). All methods take `&self`; every write
/// replaces a whole entry, so concurrent writers resolve as last-write-wins.
pub struct CacheStore {
    volatile: Cache<CacheKey, CacheEntry>,
    durable: Arc<dyn DurableStore>,
    config: CacheConfig,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("config", &self.config)
            .field("volatile entries", &self.volatile.entry_count())
            .finish()
    }
}

impl CacheStore {
    /// Create a store with an in-memory durable layer.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_durable(config, Arc::new(MemoryDurableStore::new()))
    }

    /// Create a store on top of an existing durable layer.
    pub fn with_durable(config: CacheConfig, durable: Arc<dyn DurableStore>) -> Self {
        let volatile = Cache::builder()
            .max_capacity(config.max_entries)
            .expire_after(EntryExpiry)
            .build();
        Self {
            volatile,
            durable,
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Store a dataset under the TTL of its class.
    ///
    /// Always succeeds. A durable write failure is logged and swallowed.
    pub fn set(&self, key: CacheKey, value: Arc<Dataset>, class: TtlClass) {
        self.set_with_ttl(key, value, self.config.ttl_for(class));
    }

    /// Store a dataset with an explicit TTL.
    pub fn set_with_ttl(&self, key: CacheKey, value: Arc<Dataset>, ttl: Duration) {
        let entry = CacheEntry::new(value, ttl);
        self.volatile.insert(key, entry.clone());

        let storage_key = key.storage_key();
        let written = entry
            .to_envelope()
            .and_then(|json| self.durable.set(&storage_key, &json));
        if let Err(e) = written {
            warn!(key = %storage_key, error = %e, "failed to write durable cache entry");
            record_durable_error("write");
        }
    }

    /// Fetch a fresh dataset, or `None` if absent or expired.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Dataset>> {
        self.get_entry(key).map(CacheEntry::into_value)
    }

    /// Fetch a fresh entry with its metadata.
    pub fn get_entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        if let Some(entry) = self.volatile.get(key) {
            if !entry.is_expired() {
                return Some(entry);
            }
            self.volatile.invalidate(key);
        }

        let entry = self.read_durable(key)?;
        if entry.is_expired() {
            return None;
        }
        debug!(key = %key, "promoting durable cache entry");
        self.volatile.insert(*key, entry.clone());
        Some(entry)
    }

    /// Whether a fresh entry exists. Equivalent to `get(key).is_some()`.
    pub fn has(&self, key: &CacheKey) -> bool {
        self.get_entry(key).is_some()
    }

    /// Remove one entry from both layers.
    pub fn invalidate(&self, key: &CacheKey) {
        self.volatile.invalidate(key);
        if let Err(e) = self.durable.remove(&key.storage_key()) {
            warn!(key = %key, error = %e, "failed to remove durable cache entry");
            record_durable_error("remove");
        }
    }

    /// Remove the entry `kind` would use for a `(session, meeting)` pair.
    pub fn invalidate_kind(&self, kind: DatasetKind, session_key: u32, meeting_key: u32) {
        self.invalidate(&CacheKey::for_dataset(kind, session_key, meeting_key));
    }

    /// Remove every entry qualified by `scope` from both layers.
    pub fn invalidate_scope(&self, scope: ScopeKey) {
        for kind in DatasetKind::ALL {
            if let Some(key) = CacheKey::new(kind, scope) {
                self.invalidate(&key);
            }
        }
    }

    /// Remove all expired (or unreadable) entries from both layers.
    ///
    /// Returns the number of distinct keys removed.
    pub fn sweep_expired(&self) -> usize {
        let mut removed = std::collections::HashSet::new();

        let expired: Vec<CacheKey> = self
            .volatile
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| *key)
            .collect();
        for key in expired {
            self.volatile.invalidate(&key);
            removed.insert(key);
        }

        for storage_key in self.durable_keys() {
            let Some(key) = CacheKey::from_storage_key(&storage_key) else {
                continue;
            };
            let stale = match self.durable.get(&storage_key) {
                Ok(Some(json)) => CacheEntry::from_envelope(&json)
                    .map(|entry| entry.is_expired())
                    .unwrap_or(true),
                Ok(None) => false,
                Err(e) => {
                    warn!(key = %storage_key, error = %e, "failed to read durable cache entry");
                    record_durable_error("read");
                    false
                }
            };
            if stale {
                match self.durable.remove(&storage_key) {
                    Ok(()) => {
                        removed.insert(key);
                    }
                    Err(e) => {
                        warn!(key = %storage_key, error = %e, "failed to remove durable cache entry");
                        record_durable_error("remove");
                    }
                }
            }
        }

        self.volatile.run_pending_tasks();
        debug!(removed = removed.len(), "swept expired cache entries");
        removed.len()
    }

    /// Remove every dataset entry from both layers.
    pub fn clear(&self) {
        self.volatile.invalidate_all();
        for storage_key in self.durable_keys() {
            if CacheKey::from_storage_key(&storage_key).is_some()
                && let Err(e) = self.durable.remove(&storage_key)
            {
                warn!(key = %storage_key, error = %e, "failed to remove durable cache entry");
                record_durable_error("remove");
            }
        }
    }

    /// Entry counts per layer.
    pub fn stats(&self) -> CacheStats {
        self.volatile.run_pending_tasks();
        let durable_entries = self.durable.len().unwrap_or_else(|e| {
            warn!(error = %e, "failed to count durable cache entries");
            record_durable_error("read");
            0
        });
        CacheStats {
            volatile_entries: self.volatile.entry_count(),
            durable_entries,
        }
    }

    fn read_durable(&self, key: &CacheKey) -> Option<CacheEntry> {
        let storage_key = key.storage_key();
        let json = match self.durable.get(&storage_key) {
            Ok(json) => json?,
            Err(e) => {
                warn!(key = %storage_key, error = %e, "failed to read durable cache entry");
                record_durable_error("read");
                return None;
            }
        };
        match CacheEntry::from_envelope(&json) {
            Ok(entry) if entry.value().kind() == key.kind => Some(entry),
            Ok(entry) => {
                warn!(
                    key = %storage_key,
                    found = %entry.value().kind(),
                    "durable cache entry holds the wrong dataset kind"
                );
                record_durable_error("read");
                None
            }
            Err(e) => {
                warn!(key = %storage_key, error = %e, "malformed durable cache entry");
                record_durable_error("read");
                None
            }
        }
    }

    fn durable_keys(&self) -> Vec<String> {
        self.durable.keys().unwrap_or_else(|e| {
            warn!(error = %e, "failed to list durable cache entries");
            record_durable_error("read");
            Vec::new()
        })
    }
}

fn record_durable_error(operation: &'static str) {
    metrics::counter!(telemetry::DURABLE_ERRORS_TOTAL, "operation" => operation).increment(1);
}
