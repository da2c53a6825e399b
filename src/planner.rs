//! Freshness planner.
//!
//! Decides, for one `(session, meeting)` pair, which registered datasets are
//! fresh in cache and which need a network fetch. Planning reads cache state
//! only: two plans computed without an intervening cache write are equal.

use std::sync::Arc;

use tracing::debug;

use crate::cache::CacheStore;
use crate::registry::DatasetRegistry;
use crate::telemetry;
use crate::types::{CacheKey, DatasetKind};

/// Per-load decision of which datasets to fetch.
///
/// Holds exactly one entry per planned kind, in registry order. Immutable;
/// use [`with_refetch()`](Self::with_refetch) to derive an adjusted plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    session_key: u32,
    meeting_key: u32,
    entries: Vec<(DatasetKind, bool)>,
}

impl FetchPlan {
    /// Build a plan from explicit `(kind, needs_fetch)` decisions.
    ///
    /// Order is preserved as given; a later duplicate of a kind replaces the
    /// earlier decision.
    pub fn from_decisions(
        session_key: u32,
        meeting_key: u32,
        decisions: impl IntoIterator<Item = (DatasetKind, bool)>,
    ) -> Self {
        let mut entries: Vec<(DatasetKind, bool)> = Vec::new();
        for (kind, needs_fetch) in decisions {
            match entries.iter_mut().find(|(k, _)| *k == kind) {
                Some(entry) => entry.1 = needs_fetch,
                None => entries.push((kind, needs_fetch)),
            }
        }
        Self {
            session_key,
            meeting_key,
            entries,
        }
    }

    pub fn session_key(&self) -> u32 {
        self.session_key
    }

    pub fn meeting_key(&self) -> u32 {
        self.meeting_key
    }

    /// `Some(true)` if `kind` must be fetched, `Some(false)` if cached,
    /// `None` if the plan does not cover it.
    pub fn needs_fetch(&self, kind: DatasetKind) -> Option<bool> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, needs_fetch)| *needs_fetch)
    }

    /// All decisions, in plan order.
    pub fn entries(&self) -> &[(DatasetKind, bool)] {
        &self.entries
    }

    /// Kinds needing a fetch, in plan order.
    pub fn to_fetch(&self) -> impl Iterator<Item = DatasetKind> + '_ {
        self.entries.iter().filter(|(_, f)| *f).map(|(k, _)| *k)
    }

    /// Kinds served from cache, in plan order.
    pub fn cached(&self) -> impl Iterator<Item = DatasetKind> + '_ {
        self.entries.iter().filter(|(_, f)| !*f).map(|(k, _)| *k)
    }

    pub fn fetch_count(&self) -> usize {
        self.to_fetch().count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A copy of this plan with `kinds` switched to "needs fetch".
    pub fn with_refetch(&self, kinds: &[DatasetKind]) -> Self {
        let mut plan = self.clone();
        for (kind, needs_fetch) in &mut plan.entries {
            if kinds.contains(kind) {
                *needs_fetch = true;
            }
        }
        plan
    }
}

/// Classifies registered datasets as cache hits or fetches.
#[derive(Debug, Clone)]
pub struct FreshnessPlanner {
    registry: Arc<DatasetRegistry>,
    cache: Arc<CacheStore>,
}

impl FreshnessPlanner {
    pub fn new(registry: Arc<DatasetRegistry>, cache: Arc<CacheStore>) -> Self {
        Self { registry, cache }
    }

    /// Plan a load: a kind needs a fetch iff its cache key has no fresh entry.
    pub fn plan(&self, session_key: u32, meeting_key: u32) -> FetchPlan {
        let plan = FetchPlan::from_decisions(
            session_key,
            meeting_key,
            self.registry.kinds().map(|kind| {
                let key = CacheKey::for_dataset(kind, session_key, meeting_key);
                let hit = self.cache.has(&key);
                record_lookup(kind, hit);
                (kind, !hit)
            }),
        );
        debug!(
            session_key,
            meeting_key,
            planned = plan.len(),
            to_fetch = plan.fetch_count(),
            "planned dataset load"
        );
        plan
    }

    /// Plan a refresh: every registered kind needs a fetch.
    pub fn plan_refresh(&self, session_key: u32, meeting_key: u32) -> FetchPlan {
        FetchPlan::from_decisions(
            session_key,
            meeting_key,
            self.registry.kinds().map(|kind| (kind, true)),
        )
    }
}

fn record_lookup(kind: DatasetKind, hit: bool) {
    let name = if hit {
        telemetry::CACHE_HITS_TOTAL
    } else {
        telemetry::CACHE_MISSES_TOTAL
    };
    metrics::counter!(name, "dataset" => kind.as_str()).increment(1);
}
