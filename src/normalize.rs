//! Canonical form for freshly fetched records.
//!
//! Two rules apply:
//!
//! - every `driver_number` becomes [`DriverNumber::Canonical`], so joins
//!   across datasets compare strings;
//! - stints gain `lap_interval = [lap_start, lap_end]`.
//!
//! Kinds without a driver number or derived field (weather, session and
//! meeting metadata) pass through unchanged. [`normalize`] is idempotent,
//! which matters because cache hits re-surface already normalized data.

use crate::types::{Dataset, DriverNumber, Stint};

/// Normalize one dataset. Pure and idempotent.
pub fn normalize(dataset: Dataset) -> Dataset {
    match dataset {
        Dataset::Drivers(mut records) => {
            records.iter_mut().for_each(|r| canonical(&mut r.driver_number));
            Dataset::Drivers(records)
        }
        Dataset::Laps(mut records) => {
            records.iter_mut().for_each(|r| canonical(&mut r.driver_number));
            Dataset::Laps(records)
        }
        Dataset::Stint(mut records) => {
            records.iter_mut().for_each(normalize_stint);
            Dataset::Stint(records)
        }
        Dataset::Position(mut records) => {
            records.iter_mut().for_each(|r| canonical(&mut r.driver_number));
            Dataset::Position(records)
        }
        Dataset::RaceControl(mut records) => {
            records.iter_mut().for_each(|r| canonical(&mut r.driver_number));
            Dataset::RaceControl(records)
        }
        Dataset::Pit(mut records) => {
            records.iter_mut().for_each(|r| canonical(&mut r.driver_number));
            Dataset::Pit(records)
        }
        Dataset::SessionResult(mut records) => {
            records.iter_mut().for_each(|r| canonical(&mut r.driver_number));
            Dataset::SessionResult(records)
        }
        other @ (Dataset::Session(_) | Dataset::Weather(_) | Dataset::Meeting(_)) => other,
    }
}

fn canonical(number: &mut Option<DriverNumber>) {
    *number = number.take().map(DriverNumber::canonicalize);
}

fn normalize_stint(stint: &mut Stint) {
    canonical(&mut stint.driver_number);
    stint.lap_interval = Some([stint.lap_start, stint.lap_end]);
}
