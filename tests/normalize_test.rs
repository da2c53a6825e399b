//! Integration tests for record normalization.

use serde_json::{Value, json};

use paddock::{Dataset, DatasetKind, DriverNumber, normalize};

fn raw(kind: DatasetKind, records: Value) -> Dataset {
    Dataset::from_json(kind, records).unwrap()
}

fn samples() -> Vec<Dataset> {
    vec![
        raw(DatasetKind::Drivers, json!([{ "driver_number": 44, "name_acronym": "HAM" }])),
        raw(DatasetKind::Session, json!([{ "session_key": 9158, "session_name": "Race" }])),
        raw(DatasetKind::Laps, json!([{ "driver_number": 44, "lap_number": 1, "lap_duration": 91.2 }])),
        raw(
            DatasetKind::Stint,
            json!([{ "driver_number": 44, "stint_number": 1, "lap_start": 1, "lap_end": 20 }]),
        ),
        raw(DatasetKind::Position, json!([{ "driver_number": 44, "position": 3 }])),
        raw(DatasetKind::RaceControl, json!([{ "driver_number": 44, "flag": "BLUE" }, { "flag": "GREEN" }])),
        raw(DatasetKind::Pit, json!([{ "driver_number": 44, "pit_duration": 22.4 }])),
        raw(DatasetKind::Weather, json!([{ "air_temperature": 26.0, "rainfall": 0 }])),
        raw(DatasetKind::Meeting, json!([{ "meeting_key": 1219, "meeting_name": "Singapore" }])),
        raw(DatasetKind::SessionResult, json!([{ "driver_number": 44, "position": 3, "dnf": false }])),
    ]
}

#[test]
fn normalization_is_idempotent_for_every_kind() {
    for dataset in samples() {
        let once = normalize(dataset.clone());
        let twice = normalize(once.clone());
        assert_eq!(once, twice, "{} not idempotent", dataset.kind());
    }
}

#[test]
fn normalization_keeps_kind_and_length() {
    for dataset in samples() {
        let normalized = normalize(dataset.clone());
        assert_eq!(normalized.kind(), dataset.kind());
        assert_eq!(normalized.len(), dataset.len());
    }
}

#[test]
fn numeric_lap_driver_joins_string_stint_driver() {
    let laps = normalize(raw(DatasetKind::Laps, json!([{ "driver_number": 44, "lap_number": 7 }])));
    let stints = normalize(raw(
        DatasetKind::Stint,
        json!([{ "driver_number": "44", "lap_start": 1, "lap_end": 18 }]),
    ));

    let lap_driver = laps.as_laps().unwrap()[0].driver_number.clone();
    let stint_driver = stints.as_stints().unwrap()[0].driver_number.clone();

    assert_eq!(lap_driver, Some(DriverNumber::Canonical("44".into())));
    assert_eq!(lap_driver, stint_driver);
}

#[test]
fn raw_numeric_number_does_not_join_until_normalized() {
    let laps = raw(DatasetKind::Laps, json!([{ "driver_number": 44 }]));
    let lap_driver = laps.as_laps().unwrap()[0].driver_number.clone().unwrap();
    assert_ne!(lap_driver, DriverNumber::from("44"));
    assert_eq!(lap_driver.canonicalize(), DriverNumber::from("44"));
}

#[test]
fn stint_interval_is_derived() {
    let stints = normalize(raw(
        DatasetKind::Stint,
        json!([
            { "driver_number": 1, "lap_start": 1, "lap_end": 22 },
            { "driver_number": 1, "lap_start": 23 },
        ]),
    ));
    let stints = stints.as_stints().unwrap();
    assert_eq!(stints[0].lap_interval, Some([Some(1), Some(22)]));
    assert_eq!(stints[1].lap_interval, Some([Some(23), None]));
}

#[test]
fn normalized_records_serialize_driver_numbers_as_strings() {
    let drivers = normalize(raw(DatasetKind::Drivers, json!([{ "driver_number": 1 }])));
    let value = serde_json::to_value(&drivers).unwrap();
    assert_eq!(value["records"][0]["driver_number"], "1");
}

#[test]
fn unmodelled_fields_survive_normalization() {
    let laps = normalize(raw(
        DatasetKind::Laps,
        json!([{ "driver_number": 4, "segments_sector_2": [2049, 2051] }]),
    ));
    assert_eq!(
        laps.as_laps().unwrap()[0].extra["segments_sector_2"],
        json!([2049, 2051])
    );
}
