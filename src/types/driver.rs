//! Driver number identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A driver's racing number as it appears in a record.
///
/// The remote API emits numbers (`44`), but cross-dataset joins compare
/// identifiers as strings. A freshly parsed record may therefore hold either
/// form; after normalization every driver number is [`Canonical`](Self::Canonical).
///
/// `Numeric(44)` and `Canonical("44")` compare unequal, so joins must run on
/// normalized records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DriverNumber {
    /// Number as received from the wire.
    Numeric(serde_json::Number),
    /// Canonical string form.
    Canonical(String),
}

impl DriverNumber {
    /// Coerce to the canonical string form. Canonical values are returned as-is.
    ///
    /// A whole float such as `44.0` renders as `"44"`, matching the integer
    /// form.
    pub fn canonicalize(self) -> Self {
        match self {
            Self::Numeric(n) => Self::Canonical(match n.as_f64() {
                Some(f) if n.is_f64() => f.to_string(),
                _ => n.to_string(),
            }),
            canonical => canonical,
        }
    }

    pub fn is_canonical(&self) -> bool {
        matches!(self, Self::Canonical(_))
    }

    /// String form, if already canonical.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Canonical(s) => Some(s),
            Self::Numeric(_) => None,
        }
    }
}

impl fmt::Display for DriverNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Canonical(s) => f.write_str(s),
        }
    }
}

impl From<u32> for DriverNumber {
    fn from(n: u32) -> Self {
        Self::Numeric(n.into())
    }
}

impl From<&str> for DriverNumber {
    fn from(s: &str) -> Self {
        Self::Canonical(s.to_string())
    }
}
