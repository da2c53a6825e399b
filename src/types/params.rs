//! Query parameters passed to dataset fetchers.

use serde::Serialize;

use super::ScopeKey;

/// Filter for a dataset fetch.
///
/// Serializes as a query string; unset fields are omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_key: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_key: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
}

impl FetchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Params selecting exactly one scope.
    pub fn for_scope(scope: ScopeKey) -> Self {
        match scope {
            ScopeKey::Session(id) => Self::new().session_key(id),
            ScopeKey::Meeting(id) => Self::new().meeting_key(id),
        }
    }

    pub fn session_key(mut self, key: u32) -> Self {
        self.session_key = Some(key);
        self
    }

    pub fn meeting_key(mut self, key: u32) -> Self {
        self.meeting_key = Some(key);
        self
    }

    pub fn year(mut self, year: u32) -> Self {
        self.year = Some(year);
        self
    }
}
