//! Dataset identities and cache keys.
//!
//! A [`DatasetKind`] names one of the logically distinct datasets a session
//! exposes. Each kind is scoped either by session or by meeting, which
//! determines the [`ScopeKey`] half of its [`CacheKey`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::PaddockError;
use crate::registry;

/// The datasets a session can be loaded with, in registry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatasetKind {
    Drivers,
    Session,
    Laps,
    Stint,
    Position,
    RaceControl,
    Pit,
    Weather,
    Meeting,
    SessionResult,
}

impl DatasetKind {
    /// Every kind, in registry order.
    pub const ALL: [DatasetKind; 10] = [
        Self::Drivers,
        Self::Session,
        Self::Laps,
        Self::Stint,
        Self::Position,
        Self::RaceControl,
        Self::Pit,
        Self::Weather,
        Self::Meeting,
        Self::SessionResult,
    ];

    /// Canonical name, used in durable storage keys and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drivers => "drivers",
            Self::Session => "session",
            Self::Laps => "laps",
            Self::Stint => "stint",
            Self::Position => "position",
            Self::RaceControl => "race_control",
            Self::Pit => "pit",
            Self::Weather => "weather",
            Self::Meeting => "meeting",
            Self::SessionResult => "session_result",
        }
    }

    /// TTL class declared for this kind in the dataset table.
    pub fn ttl_class(&self) -> TtlClass {
        registry::descriptor(*self).ttl_class
    }

    /// Scope declared for this kind in the dataset table.
    pub fn scope_kind(&self) -> ScopeKind {
        registry::descriptor(*self).scope
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = PaddockError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| PaddockError::DataError(format!("unknown dataset kind '{s}'")))
    }
}

impl Serialize for DatasetKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DatasetKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Expiration class of a dataset.
///
/// Both classes currently resolve to the same duration, see
/// [`CacheConfig`](crate::cache::CacheConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TtlClass {
    /// Roster, session and meeting metadata. Rarely changes mid-session.
    Static,
    /// Laps, positions, stints, pit stops, weather, race control.
    /// Appended to while a session is live.
    Dynamic,
}

/// Which identifier qualifies a dataset's cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Session,
    Meeting,
}

/// A session or meeting identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    Session(u32),
    Meeting(u32),
}

impl ScopeKey {
    /// Raw numeric identifier.
    pub fn id(&self) -> u32 {
        match self {
            Self::Session(id) | Self::Meeting(id) => *id,
        }
    }

    pub fn kind(&self) -> ScopeKind {
        match self {
            Self::Session(_) => ScopeKind::Session,
            Self::Meeting(_) => ScopeKind::Meeting,
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session(id) => write!(f, "session {id}"),
            Self::Meeting(id) => write!(f, "meeting {id}"),
        }
    }
}

/// Cache identity of one dataset: `(kind, scope)`.
///
/// Two datasets with equal keys are interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: DatasetKind,
    pub scope: ScopeKey,
}

impl CacheKey {
    /// Build a key from an explicit scope.
    ///
    /// Returns `None` if the scope does not match the kind's declared scope.
    pub fn new(kind: DatasetKind, scope: ScopeKey) -> Option<Self> {
        (kind.scope_kind() == scope.kind()).then_some(Self { kind, scope })
    }

    /// Derive the key for `kind` from a `(session, meeting)` pair.
    pub fn for_dataset(kind: DatasetKind, session_key: u32, meeting_key: u32) -> Self {
        let scope = match kind.scope_kind() {
            ScopeKind::Session => ScopeKey::Session(session_key),
            ScopeKind::Meeting => ScopeKey::Meeting(meeting_key),
        };
        Self { kind, scope }
    }

    /// Namespaced key used by the durable layer: `"<kind>_<scope id>"`.
    pub fn storage_key(&self) -> String {
        format!("{}_{}", self.kind, self.scope.id())
    }

    /// Parse a durable layer key produced by [`storage_key()`](Self::storage_key).
    pub fn from_storage_key(key: &str) -> Option<Self> {
        let (kind, id) = key.rsplit_once('_')?;
        let kind: DatasetKind = kind.parse().ok()?;
        let id: u32 = id.parse().ok()?;
        Some(Self::for_dataset(kind, id, id))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}
