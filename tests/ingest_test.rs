//! Integration tests for ingestion and normalization

use geofocus::{load_signals_from_readers, GeoFocusError};

const EXPORT_A: &str = r#"{
    "query-1": {
        "response": {
            "signals": [
                {"timestamp": 1700000200000, "registrationID": "dev-b",
                 "ipAddress": "10.0.0.2", "latitude": 51.51, "longitude": -0.13,
                 "markerColour": "blue"},
                {"timestamp": 1700000000000, "registrationID": "dev-a",
                 "ipAddress": "10.0.0.1", "latitude": 51.50, "longitude": -0.12,
                 "markerColour": "red"}
            ]
        }
    }
}"#;

const EXPORT_B: &str = r#"{
    "query-2": {
        "response": {
            "signals": [
                {"timestamp": 1700000100000, "registrationID": "dev-c",
                 "ipAddress": "10.0.0.3", "latitude": 48.85, "longitude": 2.35,
                 "markerColour": "green"}
            ]
        }
    }
}"#;

#[test]
fn test_multiple_files_merge_time_sorted() {
    let collection =
        load_signals_from_readers(vec![EXPORT_A.as_bytes(), EXPORT_B.as_bytes()]).unwrap();

    assert_eq!(collection.len(), 3);

    // Final ordering is time-based regardless of file order.
    let ids: Vec<&str> = collection
        .iter()
        .map(|r| r.registration_id.as_str())
        .collect();
    assert_eq!(ids, vec!["dev-a", "dev-c", "dev-b"]);

    let reversed =
        load_signals_from_readers(vec![EXPORT_B.as_bytes(), EXPORT_A.as_bytes()]).unwrap();
    assert_eq!(collection, reversed);
}

#[test]
fn test_ingest_twice_is_idempotent() {
    let once = load_signals_from_readers(vec![EXPORT_A.as_bytes()]).unwrap();
    let twice = load_signals_from_readers(vec![EXPORT_A.as_bytes(), EXPORT_A.as_bytes()]).unwrap();

    assert_eq!(once, twice);
}

#[test]
fn test_timestamps_converted_from_millis() {
    let collection = load_signals_from_readers(vec![EXPORT_A.as_bytes()]).unwrap();
    assert_eq!(
        collection.records()[0].timestamp.timestamp_millis(),
        1_700_000_000_000
    );
}

#[test]
fn test_missing_required_field_names_the_field() {
    let broken = r#"{"q": {"response": {"signals": [
        {"timestamp": 1700000000000, "registrationID": "dev-a",
         "ipAddress": "10.0.0.1", "latitude": 51.5, "longitude": -0.12}
    ]}}}"#;

    let err = load_signals_from_readers(vec![broken.as_bytes()]).unwrap_err();
    match err {
        GeoFocusError::MissingField { field, record_index } => {
            assert_eq!(field, "markerColour");
            assert_eq!(record_index, 0);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_schema_error_aborts_whole_batch() {
    let broken = r#"{"q": {"response": {"signals": [
        {"timestamp": 1700000000000, "registrationID": "dev-a",
         "ipAddress": "10.0.0.1", "latitude": 51.5, "longitude": -0.12,
         "markerColour": "red"},
        {"timestamp": 1700000001000}
    ]}}}"#;

    // No partial collection: the good first record does not survive.
    assert!(load_signals_from_readers(vec![broken.as_bytes()]).is_err());
}

#[test]
fn test_files_with_no_signals_contribute_nothing() {
    let empty = r#"{"q": {"response": {"signals": []}}, "r": {"response": {}}}"#;
    let collection =
        load_signals_from_readers(vec![empty.as_bytes(), EXPORT_B.as_bytes()]).unwrap();
    assert_eq!(collection.len(), 1);
}
