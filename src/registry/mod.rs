//! Dataset registry: the single table of what can be loaded and how.
//!
//! Two layers:
//!
//! 1. [`DATASETS`]: a compiled-in row per [`DatasetKind`] declaring its
//!    TTL class, scope and remote endpoint. Planner and cache keys consult it.
//! 2. [`DatasetRegistry`]: binds a [`DatasetFetcher`] to each registered
//!    kind. The batch orchestrator consults it to know what to call.
//!
//! Adding a dataset kind means one new enum variant, one [`DATASETS`] row
//! and one fetcher registration. Planner, orchestrator and facade iterate
//! the registry and need no changes.

use std::sync::Arc;

use crate::providers::retry::{RetryConfig, RetryingFetcher};
use crate::providers::traits::DatasetFetcher;
use crate::types::{DatasetKind, ScopeKind, TtlClass};
use crate::{PaddockError, Result};

/// Static description of one dataset kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetDescriptor {
    pub kind: DatasetKind,
    pub ttl_class: TtlClass,
    pub scope: ScopeKind,
    /// Path segment of the remote endpoint, e.g. `"race_control"`.
    pub endpoint: &'static str,
}

/// One row per dataset kind, in registry order.
pub const DATASETS: [DatasetDescriptor; 10] = [
    row(DatasetKind::Drivers, TtlClass::Static, ScopeKind::Session, "drivers"),
    row(DatasetKind::Session, TtlClass::Static, ScopeKind::Session, "sessions"),
    row(DatasetKind::Laps, TtlClass::Dynamic, ScopeKind::Session, "laps"),
    row(DatasetKind::Stint, TtlClass::Dynamic, ScopeKind::Session, "stints"),
    row(DatasetKind::Position, TtlClass::Dynamic, ScopeKind::Session, "position"),
    row(DatasetKind::RaceControl, TtlClass::Dynamic, ScopeKind::Session, "race_control"),
    row(DatasetKind::Pit, TtlClass::Dynamic, ScopeKind::Session, "pit"),
    row(DatasetKind::Weather, TtlClass::Dynamic, ScopeKind::Session, "weather"),
    row(DatasetKind::Meeting, TtlClass::Static, ScopeKind::Meeting, "meetings"),
    row(DatasetKind::SessionResult, TtlClass::Static, ScopeKind::Session, "session_result"),
];

const fn row(
    kind: DatasetKind,
    ttl_class: TtlClass,
    scope: ScopeKind,
    endpoint: &'static str,
) -> DatasetDescriptor {
    DatasetDescriptor {
        kind,
        ttl_class,
        scope,
        endpoint,
    }
}

/// Static row for a kind.
pub fn descriptor(kind: DatasetKind) -> &'static DatasetDescriptor {
    // DATASETS is declared in DatasetKind order; see `table_matches_kind_order`.
    &DATASETS[kind as usize]
}

/// A registered dataset: its static row plus the fetcher that loads it.
#[derive(Clone)]
pub struct RegistryEntry {
    pub descriptor: &'static DatasetDescriptor,
    pub fetcher: Arc<dyn DatasetFetcher>,
}

impl RegistryEntry {
    pub fn kind(&self) -> DatasetKind {
        self.descriptor.kind
    }
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("kind", &self.descriptor.kind)
            .field("fetcher", &self.fetcher.name())
            .finish()
    }
}

/// Fetchers bound to dataset kinds, iterated in registry order.
///
/// When a [`RetryConfig`] is set, fetchers registered afterwards are wrapped
/// in [`RetryingFetcher`].
#[derive(Debug, Clone, Default)]
pub struct DatasetRegistry {
    entries: Vec<RegistryEntry>,
    retry_config: Option<RetryConfig>,
}

impl DatasetRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every kind with the fetcher `make` returns for it.
    pub fn from_fn(make: impl Fn(DatasetKind) -> Arc<dyn DatasetFetcher>) -> Self {
        let mut registry = Self::new();
        for kind in DatasetKind::ALL {
            registry.register(kind, make(kind));
        }
        registry
    }

    /// Set the retry configuration for subsequently registered fetchers.
    pub fn set_retry_config(&mut self, config: RetryConfig) {
        self.retry_config = Some(config);
    }

    /// Bind `fetcher` to `kind`, replacing any previous binding.
    pub fn register(&mut self, kind: DatasetKind, fetcher: Arc<dyn DatasetFetcher>) {
        let fetcher = self.maybe_wrap(kind, fetcher);
        let entry = RegistryEntry {
            descriptor: descriptor(kind),
            fetcher,
        };
        match self.entries.binary_search_by_key(&kind, RegistryEntry::kind) {
            Ok(i) => self.entries[i] = entry,
            Err(i) => self.entries.insert(i, entry),
        }
    }

    /// Builder-style [`register()`](Self::register).
    pub fn with(mut self, kind: DatasetKind, fetcher: Arc<dyn DatasetFetcher>) -> Self {
        self.register(kind, fetcher);
        self
    }

    /// Look up a kind.
    ///
    /// An unregistered kind is a programming error and yields
    /// [`PaddockError::UnknownDataset`].
    pub fn entry(&self, kind: DatasetKind) -> Result<&RegistryEntry> {
        self.entries
            .binary_search_by_key(&kind, RegistryEntry::kind)
            .map(|i| &self.entries[i])
            .map_err(|_| PaddockError::UnknownDataset(kind))
    }

    pub fn contains(&self, kind: DatasetKind) -> bool {
        self.entry(kind).is_ok()
    }

    /// Registered entries in registry order.
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Registered kinds in registry order.
    pub fn kinds(&self) -> impl Iterator<Item = DatasetKind> + '_ {
        self.entries.iter().map(RegistryEntry::kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn maybe_wrap(
        &self,
        kind: DatasetKind,
        fetcher: Arc<dyn DatasetFetcher>,
    ) -> Arc<dyn DatasetFetcher> {
        match &self.retry_config {
            Some(config) if config.max_attempts > 1 => {
                Arc::new(RetryingFetcher::new(kind, fetcher, config.clone()))
            }
            _ => fetcher,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_kind_order() {
        for (row, kind) in DATASETS.iter().zip(DatasetKind::ALL) {
            assert_eq!(row.kind, kind);
        }
        assert_eq!(DATASETS.len(), DatasetKind::ALL.len());
    }

    #[test]
    fn only_meeting_is_meeting_scoped() {
        let meeting_scoped: Vec<_> = DATASETS
            .iter()
            .filter(|r| r.scope == ScopeKind::Meeting)
            .map(|r| r.kind)
            .collect();
        assert_eq!(meeting_scoped, vec![DatasetKind::Meeting]);
    }

    #[test]
    fn roster_and_metadata_are_static() {
        for kind in [DatasetKind::Drivers, DatasetKind::Session, DatasetKind::Meeting] {
            assert_eq!(descriptor(kind).ttl_class, TtlClass::Static);
        }
        for kind in [
            DatasetKind::Laps,
            DatasetKind::Stint,
            DatasetKind::Position,
            DatasetKind::RaceControl,
            DatasetKind::Pit,
            DatasetKind::Weather,
        ] {
            assert_eq!(descriptor(kind).ttl_class, TtlClass::Dynamic);
        }
    }
}
