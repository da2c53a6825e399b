//! Retry configuration, delay calculation, and the fetcher decorator.
//!
//! Provides [`RetryConfig`] for controlling retry behaviour and
//! [`RetryingFetcher`], which wraps any [`DatasetFetcher`] with automatic
//! retry on transient errors.
//!
//! A retry happens inside the batch slot of the original fetch, so the
//! orchestrator's in-flight bound is unaffected. Keep `initial_delay` at or
//! above one rate window so retries do not crowd the remote ceiling.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::traits::DatasetFetcher;
use crate::telemetry;
use crate::types::{Dataset, DatasetKind, FetchParams};
use crate::{PaddockError, Result};

/// Configuration for retry behaviour on transient errors.
///
/// Uses exponential backoff, and honours `Retry-After` hints from
/// rate-limited responses:
///
/// ```rust
/// # use paddock::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(4)
///     .initial_delay(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 1s.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 10s.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the base delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    ///
    /// Uses exponential backoff: `initial_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }

    /// Calculate the effective delay, respecting server `retry_after` hints.
    ///
    /// If a `retry_after` duration is provided (from a `RateLimited` error),
    /// it takes precedence over the calculated backoff.
    pub fn effective_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or_else(|| self.delay_for_attempt(attempt))
    }
}

/// Execute an async operation with retry logic.
///
/// Retries on transient errors (as classified by [`PaddockError::is_transient()`])
/// up to `config.max_attempts`. Permanent errors are returned immediately.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    kind: DatasetKind,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..config.max_attempts {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() => {
                if attempt + 1 < config.max_attempts {
                    metrics::counter!(telemetry::RETRIES_TOTAL, "dataset" => kind.as_str())
                        .increment(1);
                    let delay = config.effective_delay(attempt, e.retry_after());
                    warn!(
                        dataset = %kind,
                        attempt = attempt + 1,
                        max_attempts = config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        PaddockError::Configuration("retry config allows zero attempts".to_string())
    }))
}

/// Decorator that wraps a [`DatasetFetcher`] with retry logic.
pub struct RetryingFetcher {
    kind: DatasetKind,
    inner: Arc<dyn DatasetFetcher>,
    config: RetryConfig,
}

impl RetryingFetcher {
    /// Wrap the fetcher for `kind` with retry logic.
    pub fn new(kind: DatasetKind, inner: Arc<dyn DatasetFetcher>, config: RetryConfig) -> Self {
        Self {
            kind,
            inner,
            config,
        }
    }
}

#[async_trait]
impl DatasetFetcher for RetryingFetcher {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(&self, params: &FetchParams) -> Result<Dataset> {
        with_retry(&self.config, self.kind, || self.inner.fetch(params)).await
    }
}
