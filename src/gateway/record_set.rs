//! The merged result of one session load.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::providers::FetchFailure;
use crate::types::{Dataset, DatasetKind, Driver};

/// State of one requested dataset in a [`SessionRecordSet`].
///
/// A kind that was never requested has no slot at all.
#[derive(Debug, Clone)]
pub enum DatasetSlot {
    /// Normalized records, either fresh from the network or from cache.
    Loaded(Arc<Dataset>),
    /// Requested, but the fetch failed.
    Missing(FetchFailure),
}

impl DatasetSlot {
    pub fn dataset(&self) -> Option<&Arc<Dataset>> {
        match self {
            Self::Loaded(dataset) => Some(dataset),
            Self::Missing(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FetchFailure> {
        match self {
            Self::Loaded(_) => None,
            Self::Missing(failure) => Some(failure),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// Every dataset of one `(session, meeting)` pair plus roster lookups.
///
/// Replaced wholesale on each load; never mutated once published.
#[derive(Debug, Clone)]
pub struct SessionRecordSet {
    session_key: u32,
    meeting_key: u32,
    datasets: BTreeMap<DatasetKind, DatasetSlot>,
    driver_acronym: HashMap<String, String>,
    driver_team_color: HashMap<String, String>,
}

impl SessionRecordSet {
    /// Assemble a record set and derive the roster lookups.
    pub fn new(
        session_key: u32,
        meeting_key: u32,
        datasets: BTreeMap<DatasetKind, DatasetSlot>,
    ) -> Self {
        let mut driver_acronym = HashMap::new();
        let mut driver_team_color = HashMap::new();
        let roster = datasets
            .get(&DatasetKind::Drivers)
            .and_then(DatasetSlot::dataset)
            .and_then(|d| d.as_drivers())
            .unwrap_or_default();
        for driver in roster {
            let Some(number) = &driver.driver_number else {
                continue;
            };
            if let Some(acronym) = &driver.name_acronym {
                driver_acronym
                    .entry(number.to_string())
                    .or_insert_with(|| acronym.clone());
            }
            if let Some(colour) = &driver.team_colour {
                driver_team_color
                    .entry(number.to_string())
                    .or_insert_with(|| colour.clone());
            }
        }

        Self {
            session_key,
            meeting_key,
            datasets,
            driver_acronym,
            driver_team_color,
        }
    }

    pub fn session_key(&self) -> u32 {
        self.session_key
    }

    pub fn meeting_key(&self) -> u32 {
        self.meeting_key
    }

    /// Whether this set was loaded for `(session_key, meeting_key)`.
    pub fn is_for(&self, session_key: u32, meeting_key: u32) -> bool {
        self.session_key == session_key && self.meeting_key == meeting_key
    }

    /// Slot for `kind`, or `None` if it was never requested.
    pub fn slot(&self, kind: DatasetKind) -> Option<&DatasetSlot> {
        self.datasets.get(&kind)
    }

    /// Loaded records for `kind`.
    pub fn get(&self, kind: DatasetKind) -> Option<&Arc<Dataset>> {
        self.slot(kind).and_then(DatasetSlot::dataset)
    }

    /// All slots in registry order.
    pub fn datasets(&self) -> &BTreeMap<DatasetKind, DatasetSlot> {
        &self.datasets
    }

    /// Kinds that were requested but failed.
    pub fn failures(&self) -> impl Iterator<Item = &FetchFailure> {
        self.datasets.values().filter_map(DatasetSlot::failure)
    }

    /// `true` if every requested kind loaded.
    pub fn is_complete(&self) -> bool {
        self.datasets.values().all(DatasetSlot::is_loaded)
    }

    /// The session roster, empty if drivers failed to load.
    pub fn drivers(&self) -> &[Driver] {
        self.get(DatasetKind::Drivers)
            .and_then(|d| d.as_drivers())
            .unwrap_or_default()
    }

    /// Driver number to three-letter acronym. First roster entry wins.
    pub fn driver_acronym(&self) -> &HashMap<String, String> {
        &self.driver_acronym
    }

    /// Driver number to team colour hex. First roster entry wins.
    pub fn driver_team_color(&self) -> &HashMap<String, String> {
        &self.driver_team_color
    }

    /// Every roster driver number mapped to `true` (all drivers shown).
    pub fn default_driver_selection(&self) -> HashMap<String, bool> {
        self.drivers()
            .iter()
            .filter_map(|d| d.driver_number.as_ref())
            .map(|n| (n.to_string(), true))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use serde_json::json;

    fn with_roster(raw: serde_json::Value) -> SessionRecordSet {
        let roster = normalize(Dataset::from_json(DatasetKind::Drivers, raw).unwrap());
        let mut datasets = BTreeMap::new();
        datasets.insert(DatasetKind::Drivers, DatasetSlot::Loaded(Arc::new(roster)));
        SessionRecordSet::new(9158, 1219, datasets)
    }

    #[test]
    fn first_roster_entry_wins() {
        let set = with_roster(json!([
            { "driver_number": 44, "name_acronym": "HAM", "team_colour": "27F4D2" },
            { "driver_number": 44, "name_acronym": "XXX", "team_colour": "000000" },
            { "driver_number": 1, "name_acronym": "VER" },
        ]));
        assert_eq!(set.driver_acronym()["44"], "HAM");
        assert_eq!(set.driver_team_color()["44"], "27F4D2");
        assert_eq!(set.driver_acronym()["1"], "VER");
        assert!(!set.driver_team_color().contains_key("1"));
    }

    #[test]
    fn selection_covers_roster() {
        let set = with_roster(json!([{ "driver_number": 16 }, { "driver_number": 55 }]));
        let selection = set.default_driver_selection();
        assert_eq!(selection.len(), 2);
        assert!(selection["16"] && selection["55"]);
    }

    #[test]
    fn unrequested_kind_has_no_slot() {
        let set = with_roster(json!([]));
        assert!(set.slot(DatasetKind::Weather).is_none());
        assert!(set.is_complete());
        assert!(set.drivers().is_empty());
    }
}
