//! Dataset sources and fetch execution.
//!
//! This module contains the fetcher seam, the OpenF1 HTTP client that binds
//! it to the remote API, the retry decorator, and the batch orchestrator
//! that runs a fetch plan under the remote rate ceiling.

pub mod batch;
pub mod openf1;
pub mod retry;
pub mod traits;

pub use batch::{
    BatchConfig, BatchFetchOrchestrator, DEFAULT_BATCH_SIZE, DEFAULT_COOLDOWN, FetchFailure,
    FetchOutcome, PartialResultSet,
};
pub use openf1::OpenF1Client;
pub use retry::{RetryConfig, RetryingFetcher};
pub use traits::DatasetFetcher;
