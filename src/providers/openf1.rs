//! OpenF1 HTTP client.
//!
//! One GET endpoint per dataset kind, filtered by query parameters:
//! `GET {base}/laps?session_key=9158`. See <https://openf1.org>.
//!
//! The public API enforces a 3 requests/second ceiling. This client does
//! no throttling of its own; callers go through the batch orchestrator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::traits::DatasetFetcher;
use crate::registry::{self, DatasetRegistry};
use crate::types::{Dataset, DatasetKind, FetchParams};
use crate::{PaddockError, Result};

/// Default base URL for the OpenF1 API.
pub const DEFAULT_BASE_URL: &str = "https://api.openf1.org/v1";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the OpenF1 API.
#[derive(Debug, Clone)]
pub struct OpenF1Client {
    http: Client,
    base_url: String,
}

impl OpenF1Client {
    /// Create a client for the public API.
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom base URL and request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("paddock/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PaddockError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the raw records of one dataset kind.
    ///
    /// A 404 means the API has no records for the filter and yields an
    /// empty dataset.
    pub async fn fetch(&self, kind: DatasetKind, params: &FetchParams) -> Result<Dataset> {
        let url = format!("{}/{}", self.base_url, registry::descriptor(kind).endpoint);
        debug!(dataset = %kind, url, ?params, "fetching dataset");

        let response = self.http.get(&url).query(params).send().await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Ok(Dataset::empty(kind)),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(Duration::from_secs);
                return Err(PaddockError::RateLimited { retry_after });
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(PaddockError::Api {
                    status: status.as_u16(),
                    message: if body.is_empty() {
                        format!("OpenF1 API error: {status}")
                    } else {
                        body
                    },
                });
            }
        }

        let body = response.text().await?;
        Dataset::from_json(kind, serde_json::from_str(&body)?)
    }

    /// A fetcher bound to one dataset kind.
    pub fn fetcher(&self, kind: DatasetKind) -> Arc<dyn DatasetFetcher> {
        Arc::new(EndpointFetcher {
            client: self.clone(),
            kind,
            name: format!("openf1/{}", registry::descriptor(kind).endpoint),
        })
    }

    /// A registry binding every dataset kind to this client.
    pub fn registry(&self) -> DatasetRegistry {
        DatasetRegistry::from_fn(|kind| self.fetcher(kind))
    }
}

/// [`DatasetFetcher`] for a single OpenF1 endpoint.
struct EndpointFetcher {
    client: OpenF1Client,
    kind: DatasetKind,
    name: String,
}

#[async_trait]
impl DatasetFetcher for EndpointFetcher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, params: &FetchParams) -> Result<Dataset> {
        self.client.fetch(self.kind, params).await
    }
}
