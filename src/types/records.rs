//! Typed records for each dataset kind.
//!
//! Every field is optional: payloads are not schema-validated, and fields
//! this crate does not model are kept in `extra` so that re-serializing a
//! record (e.g. into the durable cache) loses nothing.
//!
//! Decoding is lenient per field. A value whose type does not match its
//! typed field leaves that field `None` and is kept verbatim in `extra`, so
//! one odd value never costs the rest of the record or the dataset. A record
//! that is not a JSON object becomes an empty record holding the raw value
//! under `extra["value"]`. Only a payload that is not an array is an error.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::{DatasetKind, DriverNumber};
use crate::Result;

/// Fields not modelled by a record struct.
pub type Extra = Map<String, Value>;

/// Roster entry for one driver in a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_number: Option<DriverNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcast_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_acronym: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    /// Hex colour without the leading `#`, e.g. `"3671C6"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_colour: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headshot_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_key: Option<u32>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Session metadata (practice, qualifying, race...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gmt_offset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit_key: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit_short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_key: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// One completed lap for one driver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_number: Option<DriverNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lap_number: Option<u32>,
    /// Lap time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lap_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sector_1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sector_2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sector_3: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub i1_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub i2_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub st_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_pit_out_lap: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_key: Option<u32>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A run of consecutive laps on one set of tyres.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_number: Option<DriverNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stint_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lap_start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lap_end: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compound: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tyre_age_at_start: Option<u32>,
    /// Derived `[lap_start, lap_end]`, filled in by normalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lap_interval: Option<[Option<u32>; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_key: Option<u32>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Running order sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_number: Option<DriverNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_key: Option<u32>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Race control message (flags, penalties, track limits...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RaceControl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_number: Option<DriverNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lap_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_key: Option<u32>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Pit lane visit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PitStop {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_number: Option<DriverNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lap_number: Option<u32>,
    /// Time spent in the pit lane, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pit_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_key: Option<u32>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Track-side weather sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rainfall: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_direction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_key: Option<u32>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Grand prix weekend metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_key: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_official_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit_key: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit_short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gmt_offset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Final classification entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_number: Option<DriverNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_laps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dnf: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsq: Option<bool>,
    /// Race time in seconds, or per-part times for qualifying.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Value>,
    /// Seconds, a per-part list, or a string such as `"+1 LAP"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap_to_leader: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_key: Option<u32>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// The records of one dataset kind.
///
/// Serializes adjacently tagged (`{"kind": "laps", "records": [...]}`) so a
/// cached value carries its own identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "records", rename_all = "snake_case")]
pub enum Dataset {
    #[serde(deserialize_with = "lenient_records")]
    Drivers(Vec<Driver>),
    #[serde(deserialize_with = "lenient_records")]
    Session(Vec<Session>),
    #[serde(deserialize_with = "lenient_records")]
    Laps(Vec<Lap>),
    #[serde(deserialize_with = "lenient_records")]
    Stint(Vec<Stint>),
    #[serde(deserialize_with = "lenient_records")]
    Position(Vec<Position>),
    #[serde(deserialize_with = "lenient_records")]
    RaceControl(Vec<RaceControl>),
    #[serde(deserialize_with = "lenient_records")]
    Pit(Vec<PitStop>),
    #[serde(deserialize_with = "lenient_records")]
    Weather(Vec<Weather>),
    #[serde(deserialize_with = "lenient_records")]
    Meeting(Vec<Meeting>),
    #[serde(deserialize_with = "lenient_records")]
    SessionResult(Vec<SessionResult>),
}

impl Dataset {
    pub fn kind(&self) -> DatasetKind {
        match self {
            Self::Drivers(_) => DatasetKind::Drivers,
            Self::Session(_) => DatasetKind::Session,
            Self::Laps(_) => DatasetKind::Laps,
            Self::Stint(_) => DatasetKind::Stint,
            Self::Position(_) => DatasetKind::Position,
            Self::RaceControl(_) => DatasetKind::RaceControl,
            Self::Pit(_) => DatasetKind::Pit,
            Self::Weather(_) => DatasetKind::Weather,
            Self::Meeting(_) => DatasetKind::Meeting,
            Self::SessionResult(_) => DatasetKind::SessionResult,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        match self {
            Self::Drivers(r) => r.len(),
            Self::Session(r) => r.len(),
            Self::Laps(r) => r.len(),
            Self::Stint(r) => r.len(),
            Self::Position(r) => r.len(),
            Self::RaceControl(r) => r.len(),
            Self::Pit(r) => r.len(),
            Self::Weather(r) => r.len(),
            Self::Meeting(r) => r.len(),
            Self::SessionResult(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// An empty dataset of the given kind.
    pub fn empty(kind: DatasetKind) -> Self {
        match kind {
            DatasetKind::Drivers => Self::Drivers(Vec::new()),
            DatasetKind::Session => Self::Session(Vec::new()),
            DatasetKind::Laps => Self::Laps(Vec::new()),
            DatasetKind::Stint => Self::Stint(Vec::new()),
            DatasetKind::Position => Self::Position(Vec::new()),
            DatasetKind::RaceControl => Self::RaceControl(Vec::new()),
            DatasetKind::Pit => Self::Pit(Vec::new()),
            DatasetKind::Weather => Self::Weather(Vec::new()),
            DatasetKind::Meeting => Self::Meeting(Vec::new()),
            DatasetKind::SessionResult => Self::SessionResult(Vec::new()),
        }
    }

    /// Parse a raw JSON array of records as the given kind.
    ///
    /// Fails only when `records` is not an array.
    pub fn from_json(kind: DatasetKind, records: Value) -> Result<Self> {
        let values: Vec<Value> = serde_json::from_value(records)?;
        Ok(match kind {
            DatasetKind::Drivers => Self::Drivers(decode_records(values)),
            DatasetKind::Session => Self::Session(decode_records(values)),
            DatasetKind::Laps => Self::Laps(decode_records(values)),
            DatasetKind::Stint => Self::Stint(decode_records(values)),
            DatasetKind::Position => Self::Position(decode_records(values)),
            DatasetKind::RaceControl => Self::RaceControl(decode_records(values)),
            DatasetKind::Pit => Self::Pit(decode_records(values)),
            DatasetKind::Weather => Self::Weather(decode_records(values)),
            DatasetKind::Meeting => Self::Meeting(decode_records(values)),
            DatasetKind::SessionResult => Self::SessionResult(decode_records(values)),
        })
    }

    /// Roster records, if this is the drivers dataset.
    pub fn as_drivers(&self) -> Option<&[Driver]> {
        match self {
            Self::Drivers(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_laps(&self) -> Option<&[Lap]> {
        match self {
            Self::Laps(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_stints(&self) -> Option<&[Stint]> {
        match self {
            Self::Stint(r) => Some(r),
            _ => None,
        }
    }
}

/// A record struct with a catch-all `extra` map.
trait Record: DeserializeOwned + Default {
    fn extra_mut(&mut self) -> &mut Extra;
}

macro_rules! impl_record {
    ($($ty:ty),* $(,)?) => {
        $(impl Record for $ty {
            fn extra_mut(&mut self) -> &mut Extra {
                &mut self.extra
            }
        })*
    };
}

impl_record!(
    Driver,
    Session,
    Lap,
    Stint,
    Position,
    RaceControl,
    PitStop,
    Weather,
    Meeting,
    SessionResult,
);

fn decode_records<T: Record>(values: Vec<Value>) -> Vec<T> {
    values.into_iter().map(decode_record).collect()
}

fn lenient_records<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Record,
{
    Vec::<Value>::deserialize(deserializer).map(decode_records)
}

/// Decode one record, moving mistyped fields into `extra`.
fn decode_record<T: Record>(value: Value) -> T {
    if let Ok(record) = T::deserialize(&value) {
        return record;
    }
    let Value::Object(fields) = value else {
        let mut record = T::default();
        record.extra_mut().insert("value".to_string(), value);
        return record;
    };

    let (typed, stray): (Extra, Extra) = fields.into_iter().partition(|(key, value)| {
        let single: Extra = [(key.clone(), value.clone())].into_iter().collect();
        T::deserialize(&Value::Object(single)).is_ok()
    });
    debug!(
        fields = ?stray.keys().collect::<Vec<_>>(),
        "unexpected field types kept in extra"
    );
    let typed = Value::Object(typed);
    match T::deserialize(&typed) {
        Ok(mut record) => {
            record.extra_mut().extend(stray);
            record
        }
        Err(_) => {
            let mut record = T::default();
            if let Value::Object(typed) = typed {
                record.extra_mut().extend(typed);
            }
            record.extra_mut().extend(stray);
            record
        }
    }
}
