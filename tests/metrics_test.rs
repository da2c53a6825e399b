//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use paddock::providers::{BatchConfig, BatchFetchOrchestrator, DatasetFetcher, RetryConfig};
use paddock::telemetry;
use paddock::{
    CacheConfig, CacheKey, CacheStore, Dataset, DatasetKind, DatasetRegistry, FetchParams,
    FetchPlan, FreshnessPlanner, MemoryDurableStore, PaddockError, Result,
};

// ============================================================================
// Mock fetchers
// ============================================================================

/// Succeeds for every kind except laps.
struct LapsDown {
    kind: DatasetKind,
}

#[async_trait]
impl DatasetFetcher for LapsDown {
    fn name(&self) -> &str {
        "laps-down"
    }

    async fn fetch(&self, _params: &FetchParams) -> Result<Dataset> {
        if self.kind == DatasetKind::Laps {
            return Err(PaddockError::Api {
                status: 400,
                message: "bad request".into(),
            });
        }
        Ok(Dataset::empty(self.kind))
    }
}

/// Fails once with a transient error, then succeeds.
struct Flaky {
    failures: AtomicU32,
}

#[async_trait]
impl DatasetFetcher for Flaky {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn fetch(&self, _params: &FetchParams) -> Result<Dataset> {
        if self.failures.load(Ordering::Relaxed) > 0 {
            self.failures.fetch_sub(1, Ordering::Relaxed);
            return Err(PaddockError::Http("connection reset".into()));
        }
        Ok(Dataset::empty(DatasetKind::Weather))
    }
}

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    counter_where(snapshot, name, |_| true)
}

/// Sum counter values for `name` carrying the label `label=value`.
fn counter_labelled(snapshot: &SnapshotVec, name: &str, label: &str, value: &str) -> u64 {
    counter_where(snapshot, name, |key| {
        key.key()
            .labels()
            .any(|l| l.key() == label && l.value() == value)
    })
}

fn counter_where(
    snapshot: &SnapshotVec,
    name: &str,
    filter: impl Fn(&metrics_util::CompositeKey) -> bool,
) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| {
            key.kind() == MetricKind::Counter && key.key().name() == name && filter(key)
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Check if any histogram entries exist for a given metric name.
fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

fn orchestrator() -> BatchFetchOrchestrator {
    let registry = DatasetRegistry::from_fn(|kind| Arc::new(LapsDown { kind }) as Arc<dyn DatasetFetcher>);
    BatchFetchOrchestrator::new(
        Arc::new(registry),
        BatchConfig::new().cooldown(Duration::from_millis(1)),
    )
}

fn fetch_everything() -> FetchPlan {
    FetchPlan::from_decisions(9158, 1219, DatasetKind::ALL.map(|kind| (kind, true)))
}

// ============================================================================
// Tests
// ============================================================================

/// Runs async code within a local recorder scope on the multi-thread runtime.
///
/// `block_in_place` keeps the sync `with_local_recorder` closure on the
/// current thread while `block_on` drives the inner async work.
#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn batch_execution_records_fetches_and_batches() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let results = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current()
                .block_on(async { orchestrator().execute(&fetch_everything()).await })
        })
    })
    .unwrap();
    assert_eq!(results.succeeded(), 9);

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(counter_total(&snapshot, telemetry::FETCHES_TOTAL), 10);
    assert_eq!(
        counter_labelled(&snapshot, telemetry::FETCHES_TOTAL, "status", "error"),
        1
    );
    assert_eq!(
        counter_labelled(&snapshot, telemetry::FETCHES_TOTAL, "dataset", "laps"),
        1
    );
    assert_eq!(counter_total(&snapshot, telemetry::BATCHES_TOTAL), 4);
    assert!(
        has_histogram(&snapshot, telemetry::FETCH_DURATION_SECONDS),
        "expected a duration histogram entry"
    );
}

#[test]
fn planner_records_hits_and_misses() {
    let registry = Arc::new(DatasetRegistry::from_fn(|kind| {
        Arc::new(LapsDown { kind }) as Arc<dyn DatasetFetcher>
    }));
    let cache = Arc::new(CacheStore::new(CacheConfig::new()));
    cache.set(
        CacheKey::for_dataset(DatasetKind::Drivers, 9158, 1219),
        Arc::new(Dataset::empty(DatasetKind::Drivers)),
        DatasetKind::Drivers.ttl_class(),
    );
    let planner = FreshnessPlanner::new(registry, cache);

    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let plan = metrics::with_local_recorder(&recorder, || planner.plan(9158, 1219));
    assert_eq!(plan.fetch_count(), 9);

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL), 1);
    assert_eq!(
        counter_labelled(&snapshot, telemetry::CACHE_HITS_TOTAL, "dataset", "drivers"),
        1
    );
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL), 9);
}

#[test]
fn swallowed_durable_write_is_counted() {
    let cache = CacheStore::with_durable(
        CacheConfig::new(),
        Arc::new(MemoryDurableStore::with_quota(0)),
    );

    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    metrics::with_local_recorder(&recorder, || {
        cache.set(
            CacheKey::for_dataset(DatasetKind::Weather, 1, 2),
            Arc::new(Dataset::empty(DatasetKind::Weather)),
            DatasetKind::Weather.ttl_class(),
        );
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_labelled(&snapshot, telemetry::DURABLE_ERRORS_TOTAL, "operation", "write"),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn retries_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let result = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let mut registry = DatasetRegistry::new();
                registry.set_retry_config(
                    RetryConfig::new()
                        .max_attempts(3)
                        .initial_delay(Duration::from_millis(1)),
                );
                registry.register(
                    DatasetKind::Weather,
                    Arc::new(Flaky {
                        failures: AtomicU32::new(1),
                    }),
                );
                registry
                    .entry(DatasetKind::Weather)?
                    .fetcher
                    .fetch(&FetchParams::new().session_key(9158))
                    .await
            })
        })
    });
    assert!(result.is_ok());

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_labelled(&snapshot, telemetry::RETRIES_TOTAL, "dataset", "weather"),
        1
    );
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    let results = orchestrator().execute(&fetch_everything()).await.unwrap();
    assert_eq!(results.len(), 10);
    assert_eq!(results.failures().count(), 1);
}
