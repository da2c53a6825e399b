//! SessionGateway: the public load/refresh entry point.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tracing::{debug, info, instrument};

use super::record_set::{DatasetSlot, SessionRecordSet};
use crate::cache::CacheStore;
use crate::normalize::normalize;
use crate::planner::{FetchPlan, FreshnessPlanner};
use crate::providers::BatchFetchOrchestrator;
use crate::registry::DatasetRegistry;
use crate::types::CacheKey;
use crate::{PaddockError, Result};

/// The last committed record set and the generation that produced it.
#[derive(Debug, Default)]
struct Current {
    generation: u64,
    records: Option<Arc<SessionRecordSet>>,
}

/// Loads sessions through cache, planner and batch orchestrator.
///
/// Holds the "current" [`SessionRecordSet`]. Repeated loads of the current
/// `(session, meeting)` pair return it without touching cache or network.
///
/// Every load or refresh draws a request generation. A finished load becomes
/// current only if no newer request has committed first; a superseded load
/// still returns its result to its own caller and still writes the cache.
#[derive(Debug)]
pub struct SessionGateway {
    registry: Arc<DatasetRegistry>,
    cache: Arc<CacheStore>,
    planner: FreshnessPlanner,
    orchestrator: BatchFetchOrchestrator,
    current: RwLock<Current>,
    generations: AtomicU64,
}

impl SessionGateway {
    pub(crate) fn new(
        registry: Arc<DatasetRegistry>,
        cache: Arc<CacheStore>,
        orchestrator: BatchFetchOrchestrator,
    ) -> Self {
        Self {
            planner: FreshnessPlanner::new(registry.clone(), cache.clone()),
            registry,
            cache,
            orchestrator,
            current: RwLock::new(Current::default()),
            generations: AtomicU64::new(0),
        }
    }

    /// Load every registered dataset for `(session_key, meeting_key)`.
    ///
    /// Fresh cache entries are reused; the rest are fetched in rate-limited
    /// batches, normalized and cached. Individual fetch failures show up as
    /// [`DatasetSlot::Missing`]; only an unregistered dataset fails the load.
    #[instrument(skip(self))]
    pub async fn load(&self, session_key: u32, meeting_key: u32) -> Result<Arc<SessionRecordSet>> {
        if let Some(current) = self.current()
            && current.is_for(session_key, meeting_key)
        {
            debug!("session already loaded");
            // Still a request: a slower load for other keys must not
            // replace it when it finishes.
            self.commit(self.next_generation(), &current);
            return Ok(current);
        }

        let generation = self.next_generation();
        let plan = self.planner.plan(session_key, meeting_key);
        self.run(plan, generation).await
    }

    /// Re-fetch every registered dataset for the current session.
    ///
    /// Ignores cache freshness and the already-loaded shortcut, and writes
    /// the fresh results back to cache.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Arc<SessionRecordSet>> {
        let current = self.current().ok_or(PaddockError::NoSessionLoaded)?;
        let generation = self.next_generation();
        let plan = self
            .planner
            .plan_refresh(current.session_key(), current.meeting_key());
        self.run(plan, generation).await
    }

    /// The most recently committed record set.
    pub fn current(&self) -> Option<Arc<SessionRecordSet>> {
        self.read_current().records.clone()
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn registry(&self) -> &Arc<DatasetRegistry> {
        &self.registry
    }

    async fn run(&self, plan: FetchPlan, generation: u64) -> Result<Arc<SessionRecordSet>> {
        let (session_key, meeting_key) = (plan.session_key(), plan.meeting_key());

        // Read cache hits before fetching; an entry that expired since
        // planning is fetched with the rest.
        let mut datasets = BTreeMap::new();
        let mut expired = Vec::new();
        for kind in plan.cached() {
            match self
                .cache
                .get(&CacheKey::for_dataset(kind, session_key, meeting_key))
            {
                Some(value) => {
                    datasets.insert(kind, DatasetSlot::Loaded(value));
                }
                None => expired.push(kind),
            }
        }
        let plan = if expired.is_empty() {
            plan
        } else {
            debug!(?expired, "cache entries expired after planning");
            plan.with_refetch(&expired)
        };
        let cached = datasets.len();

        let fetched = self.orchestrator.execute(&plan).await?;
        for (kind, outcome) in fetched {
            let slot = match outcome {
                Ok(raw) => {
                    let value = Arc::new(normalize(raw));
                    self.cache.set(
                        CacheKey::for_dataset(kind, session_key, meeting_key),
                        value.clone(),
                        kind.ttl_class(),
                    );
                    DatasetSlot::Loaded(value)
                }
                Err(failure) => DatasetSlot::Missing(failure),
            };
            datasets.insert(kind, slot);
        }

        let records = Arc::new(SessionRecordSet::new(session_key, meeting_key, datasets));
        let failed = records.failures().count();
        info!(
            session_key,
            meeting_key,
            cached,
            fetched = plan.fetch_count() - failed,
            failed,
            "session loaded"
        );
        self.commit(generation, &records);
        Ok(records)
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn commit(&self, generation: u64, records: &Arc<SessionRecordSet>) {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if generation > current.generation {
            current.generation = generation;
            current.records = Some(records.clone());
        } else {
            debug!(
                generation,
                committed = current.generation,
                "newer load already committed; not replacing current session"
            );
        }
    }

    fn read_current(&self) -> RwLockReadGuard<'_, Current> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }
}
