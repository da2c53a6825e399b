use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_test::{assert_err, assert_ok};
use paddock::providers::retry::{RetryConfig, RetryingFetcher};
use paddock::providers::traits::DatasetFetcher;
use paddock::{Dataset, DatasetKind, DatasetRegistry, FetchParams, PaddockError, Result};

/// Mock fetcher that fails N times then succeeds.
struct FailThenSucceed {
    fail_count: AtomicU32,
    fail_with: fn() -> PaddockError,
    total_calls: AtomicU32,
}

impl FailThenSucceed {
    fn new(failures: u32, fail_with: fn() -> PaddockError) -> Self {
        Self {
            fail_count: AtomicU32::new(failures),
            fail_with,
            total_calls: AtomicU32::new(0),
        }
    }

    fn call_count(&self) -> u32 {
        self.total_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DatasetFetcher for FailThenSucceed {
    fn name(&self) -> &str {
        "mock-retry"
    }

    async fn fetch(&self, _params: &FetchParams) -> Result<Dataset> {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        let remaining = self.fail_count.load(Ordering::Relaxed);
        if remaining > 0 {
            self.fail_count.fetch_sub(1, Ordering::Relaxed);
            return Err((self.fail_with)());
        }
        Ok(Dataset::empty(DatasetKind::Laps))
    }
}

fn fast_retry(attempts: u32) -> RetryConfig {
    RetryConfig::new()
        .max_attempts(attempts)
        .initial_delay(Duration::from_millis(1))
}

#[tokio::test]
async fn retries_on_transient_error_then_succeeds() {
    let inner = Arc::new(FailThenSucceed::new(2, || PaddockError::RateLimited {
        retry_after: None,
    }));
    let fetcher = RetryingFetcher::new(DatasetKind::Laps, inner.clone(), fast_retry(3));

    assert_ok!(fetcher.fetch(&FetchParams::new().session_key(1)).await);
    assert_eq!(inner.call_count(), 3);
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    let inner = Arc::new(FailThenSucceed::new(10, || PaddockError::Http("reset".into())));
    let fetcher = RetryingFetcher::new(DatasetKind::Laps, inner.clone(), fast_retry(3));

    let err = fetcher
        .fetch(&FetchParams::new().session_key(1))
        .await
        .unwrap_err();

    assert!(matches!(err, PaddockError::Http(_)));
    assert_eq!(inner.call_count(), 3);
}

#[tokio::test]
async fn permanent_error_is_not_retried() {
    let inner = Arc::new(FailThenSucceed::new(1, || PaddockError::Api {
        status: 400,
        message: "bad request".into(),
    }));
    let fetcher = RetryingFetcher::new(DatasetKind::Laps, inner.clone(), fast_retry(3));

    let err = fetcher
        .fetch(&FetchParams::new().session_key(1))
        .await
        .unwrap_err();

    assert!(matches!(err, PaddockError::Api { status: 400, .. }));
    assert_eq!(inner.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn honours_retry_after_hint() {
    let inner = Arc::new(FailThenSucceed::new(1, || PaddockError::RateLimited {
        retry_after: Some(Duration::from_secs(4)),
    }));
    let fetcher = RetryingFetcher::new(DatasetKind::Laps, inner.clone(), fast_retry(2));

    let start = tokio::time::Instant::now();
    fetcher
        .fetch(&FetchParams::new().session_key(1))
        .await
        .unwrap();

    assert!(start.elapsed() >= Duration::from_secs(4));
    assert_eq!(inner.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn backoff_grows_between_attempts() {
    let inner = Arc::new(FailThenSucceed::new(2, || PaddockError::Http("reset".into())));
    let config = RetryConfig::new()
        .max_attempts(3)
        .initial_delay(Duration::from_secs(1));
    let fetcher = RetryingFetcher::new(DatasetKind::Laps, inner, config);

    let start = tokio::time::Instant::now();
    fetcher
        .fetch(&FetchParams::new().session_key(1))
        .await
        .unwrap();

    // 1s, then 2s.
    assert!(start.elapsed() >= Duration::from_secs(3));
}

#[tokio::test]
async fn registry_wraps_fetchers_registered_after_retry_config() {
    let inner = Arc::new(FailThenSucceed::new(1, || PaddockError::Http("reset".into())));
    let mut registry = DatasetRegistry::new();
    registry.set_retry_config(fast_retry(2));
    registry.register(DatasetKind::Laps, inner.clone());

    let entry = registry.entry(DatasetKind::Laps).unwrap();
    assert_eq!(entry.fetcher.name(), "mock-retry");
    entry
        .fetcher
        .fetch(&FetchParams::new().session_key(1))
        .await
        .unwrap();
    assert_eq!(inner.call_count(), 2);
}

#[tokio::test]
async fn disabled_retry_config_does_not_wrap() {
    let inner = Arc::new(FailThenSucceed::new(1, || PaddockError::Http("reset".into())));
    let mut registry = DatasetRegistry::new();
    registry.set_retry_config(RetryConfig::disabled());
    registry.register(DatasetKind::Laps, inner.clone());

    let entry = assert_ok!(registry.entry(DatasetKind::Laps));
    assert_err!(entry.fetcher.fetch(&FetchParams::new().session_key(1)).await);
    assert_eq!(inner.call_count(), 1);
}
