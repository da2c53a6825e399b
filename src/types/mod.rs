//! Public types for the Paddock API.

mod dataset;
mod driver;
mod params;
mod records;

pub use dataset::{CacheKey, DatasetKind, ScopeKey, ScopeKind, TtlClass};
pub use driver::DriverNumber;
pub use params::FetchParams;
pub use records::{
    Dataset, Driver, Extra, Lap, Meeting, PitStop, Position, RaceControl, Session, SessionResult,
    Stint, Weather,
};
