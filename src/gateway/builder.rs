//! Builder for configuring gateway instances

use std::sync::Arc;
use std::time::Duration;

use super::SessionGateway;
use crate::Result;
use crate::cache::{CacheConfig, CacheStore, DurableStore};
use crate::providers::openf1::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::providers::{BatchConfig, BatchFetchOrchestrator, OpenF1Client, RetryConfig};
use crate::registry::DatasetRegistry;

/// Main entry point for creating gateway instances.
pub struct Paddock;

impl Paddock {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> PaddockBuilder {
        PaddockBuilder::new()
    }
}

/// Builder for configuring gateway instances.
///
/// Without further configuration the gateway fetches from the public OpenF1
/// API, caches in memory only, and does not retry.
#[derive(Default)]
pub struct PaddockBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    registry: Option<DatasetRegistry>,
    cache_config: CacheConfig,
    cache: Option<Arc<CacheStore>>,
    durable: Option<Arc<dyn DurableStore>>,
    batch: BatchConfig,
    retry: Option<RetryConfig>,
}

impl PaddockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different OpenF1 base URL (e.g. a mirror or a mock server).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the HTTP request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fetch through a custom registry instead of the OpenF1 client.
    ///
    /// `base_url` and `timeout` are ignored when a registry is supplied.
    pub fn registry(mut self, registry: DatasetRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Configure the cache built by [`build()`](Self::build).
    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Use an existing cache store, e.g. one shared between gateways.
    ///
    /// Takes precedence over `cache_config` and `durable`.
    pub fn cache(mut self, cache: Arc<CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the durable layer of the built cache (default: in-memory).
    pub fn durable(mut self, store: Arc<dyn DurableStore>) -> Self {
        self.durable = Some(store);
        self
    }

    /// Set batch size and inter-batch cooldown.
    pub fn batch(mut self, config: BatchConfig) -> Self {
        self.batch = config;
        self
    }

    /// Retry transient fetch failures.
    ///
    /// Applies to every fetcher, including those of a custom registry.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Build the gateway.
    pub fn build(self) -> Result<SessionGateway> {
        let registry = match self.registry {
            Some(custom) => match &self.retry {
                Some(retry) => {
                    let mut wrapped = DatasetRegistry::new();
                    wrapped.set_retry_config(retry.clone());
                    for entry in custom.entries() {
                        wrapped.register(entry.kind(), entry.fetcher.clone());
                    }
                    wrapped
                }
                None => custom,
            },
            None => {
                let client = OpenF1Client::with_timeout(
                    self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
                    self.timeout.unwrap_or(DEFAULT_TIMEOUT),
                )?;
                let mut registry = DatasetRegistry::new();
                if let Some(retry) = self.retry {
                    registry.set_retry_config(retry);
                }
                for kind in crate::types::DatasetKind::ALL {
                    registry.register(kind, client.fetcher(kind));
                }
                registry
            }
        };
        let registry = Arc::new(registry);

        let cache = match (self.cache, self.durable) {
            (Some(cache), _) => cache,
            (None, Some(durable)) => Arc::new(CacheStore::with_durable(self.cache_config, durable)),
            (None, None) => Arc::new(CacheStore::new(self.cache_config)),
        };

        let orchestrator = BatchFetchOrchestrator::new(registry.clone(), self.batch);
        Ok(SessionGateway::new(registry, cache, orchestrator))
    }
}
