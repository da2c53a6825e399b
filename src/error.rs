//! Paddock error types

use std::time::Duration;

use crate::types::DatasetKind;

/// Paddock error types
#[derive(Debug, thiserror::Error)]
pub enum PaddockError {
    // Network errors (recorded per dataset, never abort a load)
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Durable layer read/write failure.
    ///
    /// Only ever surfaces from a [`DurableStore`](crate::cache::DurableStore)
    /// implementation; the cache store converts it into a miss.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("data error: {0}")]
    DataError(String),

    // Programming errors
    /// A dataset kind was referenced that the registry does not know about.
    #[error("dataset '{0}' is not registered")]
    UnknownDataset(DatasetKind),

    #[error("no session loaded")]
    NoSessionLoaded,

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl PaddockError {
    /// Whether retrying the same request may succeed.
    ///
    /// Connection failures, rate limiting, request timeouts and 5xx API
    /// responses are transient. Everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            PaddockError::Http(_) | PaddockError::RateLimited { .. } => true,
            PaddockError::Api { status, .. } => *status == 408 || *status >= 500,
            _ => false,
        }
    }

    /// Server-provided hint for how long to wait before retrying.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            PaddockError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PaddockError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            PaddockError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            PaddockError::Http(err.to_string())
        }
    }
}

/// Result type alias for Paddock operations
pub type Result<T> = std::result::Result<T, PaddockError>;
