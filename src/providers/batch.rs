//! Rate-limited batch execution of a fetch plan.
//!
//! The "needs fetch" kinds of a [`FetchPlan`] are split, in plan order, into
//! batches of at most [`BatchConfig::batch_size`] kinds. Fetches within a
//! batch run concurrently and the batch settles only when every fetch in it
//! has settled. Between consecutive batches the orchestrator sleeps for
//! [`BatchConfig::cooldown`]; there is no sleep after the final batch.
//!
//! With the defaults (3 per batch, 350 ms cooldown) the orchestrator on its
//! own never exceeds the remote ceiling of 3 requests per second.
//!
//! A failed fetch is recorded as a [`FetchFailure`] for its kind. It does not
//! cancel its siblings and does not stop later batches.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tracing::{debug, instrument, warn};

use crate::planner::FetchPlan;
use crate::registry::{DatasetRegistry, RegistryEntry};
use crate::telemetry;
use crate::types::{CacheKey, Dataset, DatasetKind, FetchParams};
use crate::{PaddockError, Result};

/// Maximum fetches in flight per batch.
pub const DEFAULT_BATCH_SIZE: usize = 3;

/// Pause between consecutive batches.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(350);

/// Batch size and inter-batch cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Kinds fetched concurrently per batch. Always at least 1.
    pub batch_size: usize,
    /// Delay between the end of one batch and the start of the next.
    pub cooldown: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the batch size. Zero is treated as 1.
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.max(1);
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

/// A dataset that was requested but could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {error}")]
pub struct FetchFailure {
    pub kind: DatasetKind,
    /// Rendered cause.
    pub error: String,
    /// Whether a later retry may succeed.
    pub transient: bool,
}

impl FetchFailure {
    pub fn new(kind: DatasetKind, error: &PaddockError) -> Self {
        Self {
            kind,
            error: error.to_string(),
            transient: error.is_transient(),
        }
    }
}

/// Outcome of one requested fetch.
pub type FetchOutcome = std::result::Result<Dataset, FetchFailure>;

/// Per-kind outcomes of an executed plan, in plan order.
///
/// Holds one entry for every kind the plan marked "needs fetch" and nothing
/// else. Cached kinds are merged in by the caller.
#[derive(Debug, Clone, Default)]
pub struct PartialResultSet {
    results: Vec<(DatasetKind, FetchOutcome)>,
}

impl PartialResultSet {
    pub fn get(&self, kind: DatasetKind) -> Option<&FetchOutcome> {
        self.results
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, outcome)| outcome)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(DatasetKind, FetchOutcome)> {
        self.results.iter()
    }

    /// Requested kinds, in plan order.
    pub fn kinds(&self) -> impl Iterator<Item = DatasetKind> + '_ {
        self.results.iter().map(|(k, _)| *k)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FetchFailure> {
        self.results.iter().filter_map(|(_, o)| o.as_ref().err())
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|(_, o)| o.is_ok()).count()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl IntoIterator for PartialResultSet {
    type Item = (DatasetKind, FetchOutcome);
    type IntoIter = std::vec::IntoIter<(DatasetKind, FetchOutcome)>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

/// Executes fetch plans against a registry in rate-limited batches.
#[derive(Debug, Clone)]
pub struct BatchFetchOrchestrator {
    registry: Arc<DatasetRegistry>,
    config: BatchConfig,
}

impl BatchFetchOrchestrator {
    pub fn new(registry: Arc<DatasetRegistry>, config: BatchConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Fetch every "needs fetch" kind of `plan`.
    ///
    /// Returns `Err` only for [`PaddockError::UnknownDataset`], before any
    /// fetch is issued. Per-kind failures are reported inside the
    /// [`PartialResultSet`].
    #[instrument(
        skip(self, plan),
        fields(
            session_key = plan.session_key(),
            meeting_key = plan.meeting_key(),
            to_fetch = plan.fetch_count(),
        )
    )]
    pub async fn execute(&self, plan: &FetchPlan) -> Result<PartialResultSet> {
        let entries = plan
            .to_fetch()
            .map(|kind| self.registry.entry(kind))
            .collect::<Result<Vec<_>>>()?;

        let batch_size = self.config.batch_size.max(1);
        let batch_count = entries.len().div_ceil(batch_size);
        let mut results = Vec::with_capacity(entries.len());

        for (index, batch) in entries.chunks(batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.cooldown).await;
            }
            debug!(
                batch = index + 1,
                batches = batch_count,
                kinds = ?batch.iter().map(|e| e.kind()).collect::<Vec<_>>(),
                "starting fetch batch"
            );
            metrics::counter!(telemetry::BATCHES_TOTAL).increment(1);

            let outcomes = join_all(
                batch
                    .iter()
                    .map(|entry| fetch_one(entry, plan.session_key(), plan.meeting_key())),
            )
            .await;
            results.extend(outcomes);
        }

        let set = PartialResultSet { results };
        debug!(
            fetched = set.succeeded(),
            failed = set.len() - set.succeeded(),
            "fetch plan executed"
        );
        Ok(set)
    }
}

async fn fetch_one(
    entry: &RegistryEntry,
    session_key: u32,
    meeting_key: u32,
) -> (DatasetKind, FetchOutcome) {
    let kind = entry.kind();
    let params = FetchParams::for_scope(CacheKey::for_dataset(kind, session_key, meeting_key).scope);
    let start = Instant::now();

    let outcome = match entry.fetcher.fetch(&params).await {
        Ok(dataset) if dataset.kind() == kind => Ok(dataset),
        Ok(dataset) => Err(PaddockError::DataError(format!(
            "fetcher {} returned {} records for {kind}",
            entry.fetcher.name(),
            dataset.kind()
        ))),
        Err(e) => Err(e),
    };
    record_fetch(kind, start, outcome.is_ok());

    let outcome = outcome.map_err(|e| {
        warn!(dataset = %kind, fetcher = entry.fetcher.name(), error = %e, "dataset fetch failed");
        FetchFailure::new(kind, &e)
    });
    (kind, outcome)
}

fn record_fetch(kind: DatasetKind, start: Instant, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!(telemetry::FETCHES_TOTAL,
        "dataset" => kind.as_str(),
        "status" => status,
    )
    .increment(1);
    metrics::histogram!(telemetry::FETCH_DURATION_SECONDS, "dataset" => kind.as_str())
        .record(start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_batch_size_is_clamped() {
        assert_eq!(BatchConfig::new().batch_size(0).batch_size, 1);
    }

    #[test]
    fn failure_renders_kind_and_cause() {
        let failure = FetchFailure::new(
            DatasetKind::Pit,
            &PaddockError::Api {
                status: 503,
                message: "unavailable".into(),
            },
        );
        assert!(failure.transient);
        assert!(failure.to_string().starts_with("pit: "));
    }
}
