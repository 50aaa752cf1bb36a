//! Ingestion and normalization of tracking-platform signal exports.
//!
//! Export files are JSON objects keyed arbitrarily, each value holding a
//! nested `response.signals` list:
//!
//! ```json
//! { "query-1": { "response": { "signals": [ { "timestamp": 1700000000000,
//!   "registrationID": "dev-1", "ipAddress": "10.0.0.1", "latitude": 51.5,
//!   "longitude": -0.12, "markerColour": "red" } ] } } }
//! ```
//!
//! All signals across all files are concatenated in input order, reduced to
//! the six required fields (extras ignored), sorted ascending by timestamp
//! and deduplicated on full-row equality. A missing required field aborts
//! the whole batch; files with zero signals contribute nothing.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info};
use serde_json::Value;

use crate::error::{GeoFocusError, Result};
use crate::{SignalCollection, SignalRecord};

/// Load and normalize signal exports from files on disk.
pub fn load_signals<P: AsRef<Path>>(paths: &[P]) -> Result<SignalCollection> {
    let mut readers = Vec::with_capacity(paths.len());
    for path in paths {
        readers.push(BufReader::new(File::open(path)?));
    }
    load_signals_from_readers(readers)
}

/// Load and normalize signal exports from arbitrary readers.
///
/// Readers are consumed in input order; the final ordering is time-based
/// regardless of file order.
pub fn load_signals_from_readers<R: Read>(
    readers: impl IntoIterator<Item = R>,
) -> Result<SignalCollection> {
    let mut records: Vec<SignalRecord> = Vec::new();
    let mut file_count = 0usize;

    for reader in readers {
        let document: Value = serde_json::from_reader(reader)?;
        collect_signals(&document, &mut records)?;
        file_count += 1;
    }

    let raw_count = records.len();
    records.sort_by_key(|r| r.timestamp);
    let records = drop_duplicates(records);

    info!(
        "ingested {} signals from {} files ({} after dedup)",
        raw_count,
        file_count,
        records.len()
    );

    Ok(SignalCollection::from_records(records))
}

/// Append every signal found in one export document.
fn collect_signals(document: &Value, records: &mut Vec<SignalRecord>) -> Result<()> {
    let Some(entries) = document.as_object() else {
        // Not an object at the top level: nothing to collect.
        return Ok(());
    };

    for entry in entries.values() {
        let signals = entry
            .get("response")
            .and_then(|r| r.get("signals"))
            .and_then(|s| s.as_array());

        // Absent or empty signal lists are fine, they contribute nothing.
        let Some(signals) = signals else { continue };

        for signal in signals {
            let index = records.len();
            records.push(extract_record(signal, index)?);
        }
    }

    Ok(())
}

/// Reduce one raw signal object to the six required fields.
fn extract_record(signal: &Value, record_index: usize) -> Result<SignalRecord> {
    let timestamp = millis_to_datetime(required_millis(signal, "timestamp", record_index)?)?;
    let registration_id = required_str(signal, "registrationID", record_index)?;
    let ip_address = required_str(signal, "ipAddress", record_index)?;
    let latitude = required_f64(signal, "latitude", record_index)?;
    let longitude = required_f64(signal, "longitude", record_index)?;
    let marker_colour = required_str(signal, "markerColour", record_index)?;

    Ok(SignalRecord::new(
        timestamp,
        registration_id,
        ip_address,
        latitude,
        longitude,
        marker_colour,
    ))
}

fn required_str<'a>(signal: &'a Value, field: &'static str, record_index: usize) -> Result<&'a str> {
    signal
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or(GeoFocusError::MissingField {
            field,
            record_index,
        })
}

fn required_f64(signal: &Value, field: &'static str, record_index: usize) -> Result<f64> {
    signal
        .get(field)
        .and_then(|v| v.as_f64())
        .ok_or(GeoFocusError::MissingField {
            field,
            record_index,
        })
}

fn required_millis(signal: &Value, field: &'static str, record_index: usize) -> Result<i64> {
    signal
        .get(field)
        .and_then(|v| v.as_i64())
        .ok_or(GeoFocusError::MissingField {
            field,
            record_index,
        })
}

fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
        GeoFocusError::invalid_argument(format!("timestamp {millis} is out of representable range"))
    })
}

/// Remove exact-duplicate rows, keeping the first occurrence.
fn drop_duplicates(records: Vec<SignalRecord>) -> Vec<SignalRecord> {
    let mut seen: HashSet<(i64, String, String, u64, u64, String)> =
        HashSet::with_capacity(records.len());
    let before = records.len();

    let deduped: Vec<SignalRecord> = records
        .into_iter()
        .filter(|r| {
            let (ts, id, ip, lat, lng, colour) = r.dedup_key();
            seen.insert((
                ts,
                id.to_string(),
                ip.to_string(),
                lat,
                lng,
                colour.to_string(),
            ))
        })
        .collect();

    if deduped.len() < before {
        debug!("dropped {} duplicate signals", before - deduped.len());
    }

    deduped
}
