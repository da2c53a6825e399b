//! Cache entries and their durable envelope.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::types::Dataset;

/// One cached dataset with its expiration metadata.
///
/// Entries are immutable: a refresh writes a new entry, it never edits one.
/// An entry is expired iff `now - stored_at > ttl`.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    value: Arc<Dataset>,
    stored_at: SystemTime,
    ttl: Duration,
}

impl CacheEntry {
    /// Create an entry stored now.
    pub fn new(value: Arc<Dataset>, ttl: Duration) -> Self {
        Self::stored_at(value, SystemTime::now(), ttl)
    }

    /// Create an entry with an explicit storage time.
    pub fn stored_at(value: Arc<Dataset>, stored_at: SystemTime, ttl: Duration) -> Self {
        Self {
            value,
            stored_at,
            ttl,
        }
    }

    pub fn value(&self) -> &Arc<Dataset> {
        &self.value
    }

    pub fn into_value(self) -> Arc<Dataset> {
        self.value
    }

    pub fn storage_time(&self) -> SystemTime {
        self.stored_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Time since the entry was stored. Zero if the clock went backwards.
    pub fn age_at(&self, now: SystemTime) -> Duration {
        now.duration_since(self.stored_at).unwrap_or(Duration::ZERO)
    }

    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.age_at(now) > self.ttl
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }

    /// Time left before expiry, saturating at zero.
    pub fn remaining(&self) -> Duration {
        self.ttl.saturating_sub(self.age_at(SystemTime::now()))
    }

    /// Serialize as the durable `{data, timestamp, ttl}` envelope.
    ///
    /// `timestamp` is milliseconds since the Unix epoch, `ttl` is milliseconds.
    pub(crate) fn to_envelope(&self) -> Result<String> {
        let envelope = Envelope {
            data: self.value.as_ref(),
            timestamp: millis(self.stored_at.duration_since(UNIX_EPOCH).unwrap_or_default()),
            ttl: millis(self.ttl),
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    /// Parse a durable envelope.
    pub(crate) fn from_envelope(json: &str) -> Result<Self> {
        let envelope: Envelope<Dataset> = serde_json::from_str(json)?;
        Ok(Self {
            value: Arc::new(envelope.data),
            stored_at: UNIX_EPOCH + Duration::from_millis(envelope.timestamp),
            ttl: Duration::from_millis(envelope.ttl),
        })
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    data: T,
    timestamp: u64,
    ttl: u64,
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
