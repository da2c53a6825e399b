//! Paddock - session data cache and batched fetch orchestrator for OpenF1
//!
//! This crate loads every dataset of a motorsport session (roster, laps,
//! stints, positions, pit stops, weather, race control, results, session and
//! meeting metadata) from a rate-limited remote API. Fresh datasets come from
//! a two-tier cache; the rest are fetched in batches of three with a cooldown
//! between batches, normalized, and written back to the cache.
//!
//! # Example
//!
//! ```rust,no_run
//! use paddock::{DatasetKind, Paddock};
//!
//! #[tokio::main]
//! async fn main() -> paddock::Result<()> {
//!     let gateway = Paddock::builder().build()?;
//!
//!     let session = gateway.load(9158, 1219).await?;
//!     for failure in session.failures() {
//!         eprintln!("missing {failure}");
//!     }
//!     if let Some(laps) = session.get(DatasetKind::Laps) {
//!         println!("{} laps", laps.len());
//!     }
//!     println!("{:?}", session.driver_acronym().get("44"));
//!
//!     // Same keys: returned from memory, no network traffic.
//!     let again = gateway.load(9158, 1219).await?;
//!     assert!(std::sync::Arc::ptr_eq(&session, &again));
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod normalize;
pub mod planner;
pub mod providers;
pub mod registry;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use cache::{CacheConfig, CacheStats, CacheStore, DurableStore, FileDurableStore, MemoryDurableStore};
pub use config::Config;
pub use error::{PaddockError, Result};
pub use gateway::{DatasetSlot, Paddock, PaddockBuilder, SessionGateway, SessionRecordSet};
pub use normalize::normalize;
pub use planner::{FetchPlan, FreshnessPlanner};
pub use providers::{
    BatchConfig, BatchFetchOrchestrator, DatasetFetcher, FetchFailure, OpenF1Client,
    PartialResultSet, RetryConfig,
};
pub use registry::DatasetRegistry;

// Re-export all types
pub use types::{
    CacheKey, Dataset, DatasetKind, Driver, DriverNumber, FetchParams, Lap, Meeting, PitStop,
    Position, RaceControl, ScopeKey, ScopeKind, Session, SessionResult, Stint, TtlClass, Weather,
};
