//! CSV and KML export of normalized signal collections.
//!
//! CSV carries every normalized column plus the eleven hex-cell columns;
//! KML carries one Placemark point per record in geographic (EPSG:4326)
//! coordinates.

use chrono::{DateTime, SecondsFormat, Utc};
use log::info;

use crate::error::{GeoFocusError, Result};
use crate::hexgrid::{IndexedCollection, MAX_RESOLUTION, MIN_RESOLUTION};
use crate::{SignalCollection, SignalRecord};

/// Export an indexed collection as CSV with a header row.
///
/// Columns: the six normalized fields followed by `h3_res_5`..`h3_res_15`.
/// Timestamps are RFC3339 with millisecond precision.
pub fn export_csv(indexed: &IndexedCollection) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![
        "timestamp".to_string(),
        "registrationID".to_string(),
        "ipAddress".to_string(),
        "latitude".to_string(),
        "longitude".to_string(),
        "markerColour".to_string(),
    ];
    for resolution in MIN_RESOLUTION..=MAX_RESOLUTION {
        header.push(format!("h3_res_{resolution}"));
    }
    writer.write_record(&header)?;

    for (record, cells) in indexed.iter() {
        let mut row = vec![
            record
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            record.registration_id.clone(),
            record.ip_address.clone(),
            record.latitude.to_string(),
            record.longitude.to_string(),
            record.marker_colour.clone(),
        ];
        for resolution in MIN_RESOLUTION..=MAX_RESOLUTION {
            match cells.cell(resolution) {
                Some(cell) => row.push(cell.to_string()),
                None => row.push(String::new()),
            }
        }
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| GeoFocusError::invalid_argument(format!("csv writer flush failed: {e}")))?;
    let csv = String::from_utf8(bytes)
        .map_err(|e| GeoFocusError::invalid_argument(format!("csv output not UTF-8: {e}")))?;

    info!("exported {} rows as CSV", indexed.len());
    Ok(csv)
}

/// Re-parse a CSV export back into a signal collection.
///
/// Only the six normalized columns are read; the hex-cell columns are
/// recomputable and ignored.
pub fn parse_csv(data: &str) -> Result<SignalCollection> {
    let mut reader = csv::Reader::from_reader(data.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |name: &'static str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or(GeoFocusError::ColumnNotFound {
                axis: name,
                aliases: name.to_string(),
            })
    };

    let ts_col = column("timestamp")?;
    let id_col = column("registrationID")?;
    let ip_col = column("ipAddress")?;
    let lat_col = column("latitude")?;
    let lng_col = column("longitude")?;
    let colour_col = column("markerColour")?;

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        let field = |col: usize| row.get(col).unwrap_or_default();

        let timestamp: DateTime<Utc> = DateTime::parse_from_rfc3339(field(ts_col))
            .map_err(|e| {
                GeoFocusError::invalid_argument(format!("row {index}: bad timestamp: {e}"))
            })?
            .with_timezone(&Utc);
        let latitude: f64 = field(lat_col).parse().map_err(|e| {
            GeoFocusError::invalid_argument(format!("row {index}: bad latitude: {e}"))
        })?;
        let longitude: f64 = field(lng_col).parse().map_err(|e| {
            GeoFocusError::invalid_argument(format!("row {index}: bad longitude: {e}"))
        })?;

        records.push(SignalRecord::new(
            timestamp,
            field(id_col),
            field(ip_col),
            latitude,
            longitude,
            field(colour_col),
        ));
    }

    Ok(SignalCollection::from_records(records))
}

/// Export a collection as KML: one Placemark point per record, geographic
/// CRS (EPSG:4326), coordinates in `longitude,latitude` order.
pub fn export_kml(signals: &SignalCollection) -> String {
    let mut kml = String::with_capacity(256 + signals.len() * 256);

    kml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    kml.push_str("<kml xmlns=\"http://www.opengis.net/kml/2.2\">\n");
    kml.push_str("<Document>\n");

    for record in signals {
        kml.push_str("  <Placemark>\n");
        kml.push_str(&format!(
            "    <name>{}</name>\n",
            xml_escape(&record.registration_id)
        ));
        kml.push_str(&format!(
            "    <description>{} / {}</description>\n",
            xml_escape(&record.ip_address),
            xml_escape(&record.marker_colour)
        ));
        kml.push_str(&format!(
            "    <TimeStamp><when>{}</when></TimeStamp>\n",
            record
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true)
        ));
        kml.push_str(&format!(
            "    <Point><coordinates>{},{}</coordinates></Point>\n",
            record.longitude, record.latitude
        ));
        kml.push_str("  </Placemark>\n");
    }

    kml.push_str("</Document>\n");
    kml.push_str("</kml>\n");

    info!("exported {} rows as KML", signals.len());
    kml
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn indexed() -> IndexedCollection {
        let records = vec![
            SignalRecord::new(
                Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
                "dev-a",
                "10.0.0.1",
                51.5074,
                -0.1278,
                "red",
            ),
            SignalRecord::new(
                Utc.timestamp_millis_opt(1_700_000_100_000).unwrap(),
                "dev-b",
                "10.0.0.2",
                48.8566,
                2.3522,
                "blue",
            ),
        ];
        IndexedCollection::from_collection(SignalCollection::from_records(records)).unwrap()
    }

    #[test]
    fn test_csv_has_all_columns() {
        let csv = export_csv(&indexed()).unwrap();
        let header = csv.lines().next().unwrap();
        assert!(header.starts_with("timestamp,registrationID,ipAddress"));
        assert!(header.contains("h3_res_5"));
        assert!(header.contains("h3_res_15"));
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_csv_round_trip() {
        let source = indexed();
        let csv = export_csv(&source).unwrap();
        let parsed = parse_csv(&csv).unwrap();

        assert_eq!(parsed.len(), source.len());
        for (original, reparsed) in source.signals().iter().zip(parsed.iter()) {
            assert_eq!(original.timestamp, reparsed.timestamp);
            assert_eq!(original.registration_id, reparsed.registration_id);
            assert_eq!(original.latitude, reparsed.latitude);
            assert_eq!(original.longitude, reparsed.longitude);
        }
    }

    #[test]
    fn test_kml_structure() {
        let kml = export_kml(indexed().signals());
        assert!(kml.starts_with("<?xml"));
        assert_eq!(kml.matches("<Placemark>").count(), 2);
        assert!(kml.contains("<coordinates>-0.1278,51.5074</coordinates>"));
    }

    #[test]
    fn test_kml_escapes_markup() {
        let records = vec![SignalRecord::new(
            Utc.timestamp_millis_opt(0).unwrap(),
            "a<b>&c",
            "10.0.0.1",
            0.0,
            0.0,
            "red",
        )];
        let kml = export_kml(&SignalCollection::from_records(records));
        assert!(kml.contains("a&lt;b&gt;&amp;c"));
    }
}
