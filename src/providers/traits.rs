//! Fetcher trait for dataset sources.
//!
//! One fetcher loads one dataset kind. The registry binds fetchers to kinds;
//! the batch orchestrator only ever sees this trait, so tests substitute
//! in-memory fetchers and production code binds [`OpenF1Client`] endpoints.
//!
//! # Example
//!
//! ```ignore
//! struct Fixture(Dataset);
//!
//! #[async_trait]
//! impl DatasetFetcher for Fixture {
//!     fn name(&self) -> &str { "fixture" }
//!     async fn fetch(&self, _params: &FetchParams) -> Result<Dataset> {
//!         Ok(self.0.clone())
//!     }
//! }
//! ```
//!
//! [`OpenF1Client`]: super::OpenF1Client

use async_trait::async_trait;

use crate::Result;
use crate::types::{Dataset, FetchParams};

/// Loads the records of one dataset kind.
///
/// Fetches are network-latency-bearing and fallible. Errors are recorded
/// per dataset by the orchestrator and never cancel sibling fetches.
#[async_trait]
pub trait DatasetFetcher: Send + Sync {
    /// Fetcher name for logging/debugging.
    fn name(&self) -> &str;

    /// Fetch raw (un-normalized) records matching `params`.
    async fn fetch(&self, params: &FetchParams) -> Result<Dataset>;
}
