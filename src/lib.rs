//! # GeoFocus
//!
//! Spatial analytics library for geolocation signal exports.
//!
//! This library provides:
//! - Ingestion and normalization of nested JSON signal exports
//! - Multi-resolution hierarchical hexagonal indexing (H3, res 5-15)
//! - Pure time-of-day / weekday / identity filtering
//! - Frequency, hex-cell, and hour x weekday aggregation
//! - Per-device DBSCAN clustering with centroids and buffer polygons
//! - Deterministic distinct-color generation for map legends
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel per-device clustering with rayon
//! - **`http`** - Enable the HTTP reverse-geocoding client
//!
//! ## Quick Start
//!
//! ```rust
//! use geofocus::{cluster_signals, ClusterParams, SignalCollection, SignalRecord};
//! use chrono::{TimeZone, Utc};
//!
//! let records = vec![
//!     SignalRecord::new(
//!         Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
//!         "device-1",
//!         "10.0.0.1",
//!         51.5074,
//!         -0.1278,
//!         "red",
//!     ),
//! ];
//! let signals = SignalCollection::from_records(records);
//!
//! let params = ClusterParams::new(50.0, 1).unwrap();
//! let outcome = cluster_signals(&signals, &params).unwrap();
//! assert_eq!(outcome.labeled.len(), 1);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{GeoFocusError, Result};

// Ingestion and normalization of signal exports
pub mod ingest;
pub use ingest::{load_signals, load_signals_from_readers};

// Hierarchical hexagonal indexing
pub mod hexgrid;
pub use hexgrid::{HexCells, IndexedCollection, MAX_RESOLUTION, MIN_RESOLUTION};

// Pure filtering over time and identity dimensions
pub mod filter;
pub use filter::{filter_signals, FilterParams};

// Aggregation: top-N, per-cell counts, hour x weekday, heatmap weights
pub mod aggregate;
pub use aggregate::{
    count_by_cell, heatmap_weights, hour_weekday_counts, summary_stats, top_devices, CellCount,
    DeviceCount, HourWeekdayCount, SummaryStats, WeightedPoint,
};

// Coordinate reference systems and planar projection
pub mod projection;
pub use projection::{Crs, ProjectedPoint};

// Per-device DBSCAN clustering
pub mod cluster;
#[cfg(feature = "parallel")]
pub use cluster::cluster_signals_parallel;
pub use cluster::{
    cluster_signals, ClusterCentroid, ClusterParams, ClusteringOutcome, LabeledSignal, NOISE_LABEL,
};

// Deterministic distinct-color generation
pub mod colors;
pub use colors::distinct_colors;

// Explicit TTL result caching
pub mod cache;
pub use cache::TtlCache;

// CSV / KML export
pub mod export;
pub use export::{export_csv, export_kml, parse_csv};

// Reverse-geocoding collaborator contract
pub mod geocode;
pub use geocode::{GeocodeRequest, ReverseGeocoder};

// Map-rendering collaborator interface types
pub mod render;
pub use render::{BaseMap, HeatRow, ScatterRow};

// Session-level orchestration with result caching
pub mod session;
pub use session::AnalysisSession;

// ============================================================================
// Core Types
// ============================================================================

/// One geolocation observation tied to a device identity and timestamp.
///
/// Field names in the wire format follow the tracking platform's export
/// schema (`registrationID`, `ipAddress`, `markerColour`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    /// UTC instant of the observation (millisecond precision source).
    pub timestamp: DateTime<Utc>,
    /// Opaque device/identity string, stable across records.
    #[serde(rename = "registrationID")]
    pub registration_id: String,
    /// Source IP address. Passthrough, not used in core logic.
    #[serde(rename = "ipAddress")]
    pub ip_address: String,
    /// WGS84 latitude in degrees.
    pub latitude: f64,
    /// WGS84 longitude in degrees.
    pub longitude: f64,
    /// Opaque display tag. Passthrough.
    #[serde(rename = "markerColour")]
    pub marker_colour: String,
}

impl SignalRecord {
    /// Create a new signal record.
    pub fn new(
        timestamp: DateTime<Utc>,
        registration_id: &str,
        ip_address: &str,
        latitude: f64,
        longitude: f64,
        marker_colour: &str,
    ) -> Self {
        Self {
            timestamp,
            registration_id: registration_id.to_string(),
            ip_address: ip_address.to_string(),
            latitude,
            longitude,
            marker_colour: marker_colour.to_string(),
        }
    }

    /// Check if the record's coordinates are within the valid geographic range.
    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// Full-row equality key used for deduplication.
    pub(crate) fn dedup_key(&self) -> (i64, &str, &str, u64, u64, &str) {
        (
            self.timestamp.timestamp_millis(),
            self.registration_id.as_str(),
            self.ip_address.as_str(),
            self.latitude.to_bits(),
            self.longitude.to_bits(),
            self.marker_colour.as_str(),
        )
    }
}

/// An ordered sequence of signal records sharing the fixed schema.
///
/// Produced once per ingested batch; immutable after construction. All
/// downstream stages (filtering, aggregation, clustering) borrow it and
/// produce new derived collections rather than mutating in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalCollection {
    records: Vec<SignalRecord>,
}

impl SignalCollection {
    /// Create a collection from records, preserving their order.
    ///
    /// Normalization (sorting, deduplication) is the ingestion stage's
    /// contract, not this constructor's.
    pub fn from_records(records: Vec<SignalRecord>) -> Self {
        Self { records }
    }

    /// Borrow the records in order.
    pub fn records(&self) -> &[SignalRecord] {
        &self.records
    }

    /// Iterate over the records in order.
    pub fn iter(&self) -> impl Iterator<Item = &SignalRecord> {
        self.records.iter()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct identities present, in sorted order.
    pub fn identities(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .records
            .iter()
            .map(|r| r.registration_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Earliest observation timestamp, if any.
    pub fn first_seen(&self) -> Option<DateTime<Utc>> {
        self.records.iter().map(|r| r.timestamp).min()
    }

    /// Latest observation timestamp, if any.
    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.records.iter().map(|r| r.timestamp).max()
    }
}

impl<'a> IntoIterator for &'a SignalCollection {
    type Item = &'a SignalRecord;
    type IntoIter = std::slice::Iter<'a, SignalRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
