//! Telemetry metric name constants.
//!
//! Centralised metric names for paddock operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `paddock_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `dataset`: dataset kind (e.g. "drivers", "race_control")
//! - `status`: "ok" or "error"
//! - `operation`: durable layer operation, "read", "write" or "remove"

/// Total cache hits observed by the freshness planner.
///
/// Labels: `dataset`.
pub const CACHE_HITS_TOTAL: &str = "paddock_cache_hits_total";

/// Total cache misses (absent or expired).
///
/// Labels: `dataset`.
pub const CACHE_MISSES_TOTAL: &str = "paddock_cache_misses_total";

/// Total dataset fetches issued by the batch orchestrator.
///
/// Labels: `dataset`, `status` ("ok" | "error").
pub const FETCHES_TOTAL: &str = "paddock_fetches_total";

/// Dataset fetch duration in seconds.
///
/// Labels: `dataset`.
pub const FETCH_DURATION_SECONDS: &str = "paddock_fetch_duration_seconds";

/// Total batches executed by the batch orchestrator.
pub const BATCHES_TOTAL: &str = "paddock_batches_total";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `dataset`.
pub const RETRIES_TOTAL: &str = "paddock_retries_total";

/// Total swallowed durable layer failures.
///
/// Labels: `operation`.
pub const DURABLE_ERRORS_TOTAL: &str = "paddock_durable_errors_total";
