//! Interface types for the map-rendering collaborator.
//!
//! Rendering itself happens outside this crate; these are the row shapes
//! and base-map styles it consumes.

use geo::{Centroid, MultiPoint, Point};
use serde::Serialize;

use crate::aggregate::WeightedPoint;
use crate::cluster::ClusteringOutcome;
use crate::colors::distinct_colors;
use crate::error::Result;
use crate::SignalCollection;

/// The fixed set of base-map styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BaseMap {
    Light,
    Dark,
    Streets,
    Satellite,
    Outdoors,
}

impl BaseMap {
    /// All styles, in menu order.
    pub const ALL: [BaseMap; 5] = [
        BaseMap::Light,
        BaseMap::Dark,
        BaseMap::Streets,
        BaseMap::Satellite,
        BaseMap::Outdoors,
    ];

    /// The tile style URL for this base map.
    pub fn style_url(&self) -> &'static str {
        match self {
            BaseMap::Light => "mapbox://styles/mapbox/light-v10",
            BaseMap::Dark => "mapbox://styles/mapbox/dark-v10",
            BaseMap::Streets => "mapbox://styles/mapbox/streets-v11",
            BaseMap::Satellite => "mapbox://styles/mapbox/satellite-v9",
            BaseMap::Outdoors => "mapbox://styles/mapbox/outdoors-v11",
        }
    }
}

/// One raw point row for a scatter layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterRow {
    pub longitude: f64,
    pub latitude: f64,
    /// Fill color shared by all of this identity's points.
    pub color: [u8; 3],
    /// Marker radius in meters.
    pub radius: f64,
}

/// One weighted row for a heatmap layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatRow {
    pub longitude: f64,
    pub latitude: f64,
    pub weight: usize,
}

impl From<&WeightedPoint> for HeatRow {
    fn from(point: &WeightedPoint) -> Self {
        Self {
            longitude: point.longitude,
            latitude: point.latitude,
            weight: point.weight,
        }
    }
}

/// Assign one distinct color per identity, in the identities' given order.
pub fn identity_colors(identities: &[String]) -> Result<Vec<(String, [u8; 3])>> {
    let palette = distinct_colors(identities.len())?;
    Ok(identities
        .iter()
        .cloned()
        .zip(palette)
        .collect())
}

/// Scatter rows for every record, colored by identity.
///
/// Identities missing from the color table fall back to mid-grey rather
/// than being dropped.
pub fn scatter_rows(
    signals: &SignalCollection,
    colors: &[(String, [u8; 3])],
    radius: f64,
) -> Vec<ScatterRow> {
    signals
        .iter()
        .map(|record| {
            let color = colors
                .iter()
                .find(|(identity, _)| *identity == record.registration_id)
                .map(|(_, color)| *color)
                .unwrap_or([128, 128, 128]);
            ScatterRow {
                longitude: record.longitude,
                latitude: record.latitude,
                color,
                radius,
            }
        })
        .collect()
}

/// Heat rows from grouped weights.
pub fn heat_rows(weights: &[WeightedPoint]) -> Vec<HeatRow> {
    weights.iter().map(HeatRow::from).collect()
}

/// Initial view center for a map over these signals: the centroid of all
/// positions as (latitude, longitude). `None` for an empty collection.
pub fn view_center(signals: &SignalCollection) -> Option<(f64, f64)> {
    let points: Vec<Point<f64>> = signals
        .iter()
        .map(|record| Point::new(record.longitude, record.latitude))
        .collect();
    MultiPoint::from(points)
        .centroid()
        .map(|center| (center.y(), center.x()))
}

/// Buffer polygons from a clustering outcome, as closed
/// `[longitude, latitude]` rings ready for a polygon layer.
pub fn buffer_polygons(outcome: &ClusteringOutcome) -> Vec<Vec<[f64; 2]>> {
    outcome
        .centroids
        .iter()
        .map(|centroid| centroid.buffer.clone())
        .collect()
}
