//! Unified error handling for the geofocus library.
//!
//! All fallible operations return [`Result`], with [`GeoFocusError`]
//! carrying enough context to identify the offending record, column, or
//! parameter. Structural errors (schema, coordinate range) abort the whole
//! batch; geocoding failures are recoverable and must be reported to the
//! caller rather than propagated as a crash.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, GeoFocusError>;

/// Errors produced by ingestion, indexing, aggregation and clustering.
#[derive(Debug, Error)]
pub enum GeoFocusError {
    /// A required field was absent from an ingested signal record.
    #[error("signal record {record_index} is missing required field '{field}'")]
    MissingField {
        field: &'static str,
        record_index: usize,
    },

    /// A record carried a coordinate outside the valid geographic range.
    #[error(
        "record {record_index} has coordinate ({latitude}, {longitude}) outside valid range"
    )]
    CoordinateOutOfRange {
        record_index: usize,
        latitude: f64,
        longitude: f64,
    },

    /// No column matched any of the known aliases for a coordinate axis.
    #[error("no {axis} column found (tried aliases: {aliases})")]
    ColumnNotFound { axis: &'static str, aliases: String },

    /// The requested coordinate reference system is not supported.
    #[error("unrecognized coordinate reference system '{crs}'")]
    UnsupportedCrs { crs: String },

    /// An argument violated its documented constraints.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Reverse geocoding failed or timed out. Recoverable.
    #[error("geocoding failed: {reason}")]
    Geocoding { reason: String },

    /// A source file could not be read or parsed as JSON.
    #[error("failed to read signal export: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON in a signal export file.
    #[error("failed to parse signal export: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV encoding or decoding failure.
    #[error("csv processing failed: {0}")]
    Csv(#[from] csv::Error),
}

impl GeoFocusError {
    /// Shorthand for an [`GeoFocusError::InvalidArgument`] with a formatted message.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// True for failures the caller should surface as a message and continue from.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Geocoding { .. })
    }
}
