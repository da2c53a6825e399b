use std::time::Duration;

use paddock::{DatasetKind, PaddockError};

#[test]
fn network_errors_are_transient() {
    assert!(PaddockError::Http("connection refused".into()).is_transient());
    assert!(PaddockError::RateLimited { retry_after: None }.is_transient());
    for status in [408, 500, 502, 503, 504] {
        let err = PaddockError::Api {
            status,
            message: String::new(),
        };
        assert!(err.is_transient(), "{status} should be transient");
    }
}

#[test]
fn client_and_programming_errors_are_permanent() {
    for status in [400, 401, 403, 404, 422] {
        let err = PaddockError::Api {
            status,
            message: String::new(),
        };
        assert!(!err.is_transient(), "{status} should be permanent");
    }
    assert!(!PaddockError::UnknownDataset(DatasetKind::Laps).is_transient());
    assert!(!PaddockError::NoSessionLoaded.is_transient());
    assert!(!PaddockError::DataError("bad".into()).is_transient());
    assert!(!PaddockError::Storage("full".into()).is_transient());
}

#[test]
fn retry_after_only_from_rate_limit() {
    let limited = PaddockError::RateLimited {
        retry_after: Some(Duration::from_secs(3)),
    };
    assert_eq!(limited.retry_after(), Some(Duration::from_secs(3)));
    assert_eq!(PaddockError::Http("x".into()).retry_after(), None);
}

#[test]
fn json_errors_convert() {
    let err: PaddockError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
    assert!(matches!(err, PaddockError::Json(_)));
}

#[test]
fn display_names_the_dataset() {
    let err = PaddockError::UnknownDataset(DatasetKind::RaceControl);
    assert_eq!(err.to_string(), "dataset 'race_control' is not registered");
}

#[test]
fn unknown_dataset_name_is_a_data_error() {
    let err = "tyres".parse::<DatasetKind>().unwrap_err();
    assert!(matches!(err, PaddockError::DataError(_)));
}
