//! Aggregation over signal collections.
//!
//! All aggregators are pure: they borrow their input and produce new
//! result rows. They never fail on well-formed input, degrading to empty
//! results instead; the only error paths are an invalid resolution and an
//! unresolvable coordinate column.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Timelike, Utc};
use h3o::CellIndex;
use serde::Serialize;

use crate::error::{GeoFocusError, Result};
use crate::hexgrid::{IndexedCollection, MAX_RESOLUTION, MIN_RESOLUTION};
use crate::SignalCollection;

/// Weekday display labels, Monday..Sunday, in the platform's report
/// language. A pure lookup table so output is identical across
/// environments regardless of system locale.
pub const WEEKDAY_LABELS: [&str; 7] = [
    "Segunda-feira",
    "Terça-feira",
    "Quarta-feira",
    "Quinta-feira",
    "Sexta-feira",
    "Sábado",
    "Domingo",
];

/// Accepted latitude column names, in priority order.
pub const LATITUDE_ALIASES: [&str; 2] = ["latitude", "lat"];
/// Accepted longitude column names, in priority order.
pub const LONGITUDE_ALIASES: [&str; 2] = ["longitude", "lng"];

/// Signal count for one device identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceCount {
    pub registration_id: String,
    pub count: usize,
}

/// Signal count for one hexagonal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellCount {
    pub hex: CellIndex,
    pub count: usize,
}

/// Signal count for one (weekday, hour) bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourWeekdayCount {
    /// 0 = Monday .. 6 = Sunday.
    pub weekday_index: u8,
    /// Display label from [`WEEKDAY_LABELS`].
    pub weekday: &'static str,
    /// Hour of day, 0..=23.
    pub hour: u8,
    pub count: usize,
}

/// One weighted position consumed by the heatmap rendering collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Number of records observed at exactly this position.
    pub weight: usize,
}

/// Headline statistics for a signal collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryStats {
    pub unique_devices: usize,
    pub total_rows: usize,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

/// The `n` identities with the most signals, sorted descending by count.
///
/// Ties keep sorted-identity iteration order (the sort is stable), so the
/// output is fully deterministic.
pub fn top_devices(signals: &SignalCollection, n: usize) -> Vec<DeviceCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in signals {
        *counts.entry(record.registration_id.as_str()).or_default() += 1;
    }

    let mut ranked: Vec<DeviceCount> = counts
        .into_iter()
        .map(|(registration_id, count)| DeviceCount {
            registration_id: registration_id.to_string(),
            count,
        })
        .collect();

    ranked.sort_by_key(|d| std::cmp::Reverse(d.count));
    ranked.truncate(n);
    ranked
}

/// Signal counts per hexagonal cell at the chosen resolution, sorted
/// descending by count.
pub fn count_by_cell(indexed: &IndexedCollection, resolution: u8) -> Result<Vec<CellCount>> {
    if !(MIN_RESOLUTION..=MAX_RESOLUTION).contains(&resolution) {
        return Err(GeoFocusError::invalid_argument(format!(
            "resolution {resolution} outside indexed range {MIN_RESOLUTION}..={MAX_RESOLUTION}"
        )));
    }

    let mut counts: BTreeMap<CellIndex, usize> = BTreeMap::new();
    for cells in indexed.cells() {
        if let Some(cell) = cells.cell(resolution) {
            *counts.entry(cell).or_default() += 1;
        }
    }

    let mut grouped: Vec<CellCount> = counts
        .into_iter()
        .map(|(hex, count)| CellCount { hex, count })
        .collect();

    grouped.sort_by_key(|c| std::cmp::Reverse(c.count));
    Ok(grouped)
}

/// Signal counts per (weekday, hour) bucket, ordered Monday..Sunday then
/// by hour. Empty buckets are omitted.
pub fn hour_weekday_counts(signals: &SignalCollection) -> Vec<HourWeekdayCount> {
    let mut counts: BTreeMap<(u8, u8), usize> = BTreeMap::new();
    for record in signals {
        let weekday = record.timestamp.weekday().num_days_from_monday() as u8;
        let hour = record.timestamp.hour() as u8;
        *counts.entry((weekday, hour)).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|((weekday_index, hour), count)| HourWeekdayCount {
            weekday_index,
            weekday: WEEKDAY_LABELS[weekday_index as usize],
            hour,
            count,
        })
        .collect()
}

/// Group a flexible-column table by exact coordinate pairs for heatmap
/// weighting.
///
/// Column resolution tries each alias in priority order with a
/// case-insensitive comparison; the first alias present wins. Rows shorter
/// than the resolved column indices are skipped.
pub fn heatmap_weights<S: AsRef<str>>(
    columns: &[S],
    rows: &[Vec<f64>],
) -> Result<Vec<WeightedPoint>> {
    let lat_col = resolve_axis(columns, &LATITUDE_ALIASES, "latitude")?;
    let lng_col = resolve_axis(columns, &LONGITUDE_ALIASES, "longitude")?;

    Ok(group_positions(rows.iter().filter_map(|row| {
        match (row.get(lat_col), row.get(lng_col)) {
            (Some(&lat), Some(&lng)) => Some((lat, lng)),
            _ => None,
        }
    })))
}

/// Heatmap weights for a signal collection's own coordinate columns.
pub fn heatmap_weights_from_signals(signals: &SignalCollection) -> Vec<WeightedPoint> {
    group_positions(signals.iter().map(|r| (r.latitude, r.longitude)))
}

/// Headline statistics: unique devices, row count, observation time span.
pub fn summary_stats(signals: &SignalCollection) -> SummaryStats {
    SummaryStats {
        unique_devices: signals.identities().len(),
        total_rows: signals.len(),
        first_seen: signals.first_seen(),
        last_seen: signals.last_seen(),
    }
}

/// Find the column index for one axis via its alias table.
fn resolve_axis<S: AsRef<str>>(
    columns: &[S],
    aliases: &[&str],
    axis: &'static str,
) -> Result<usize> {
    for alias in aliases {
        if let Some(index) = columns
            .iter()
            .position(|c| c.as_ref().eq_ignore_ascii_case(alias))
        {
            return Ok(index);
        }
    }

    Err(GeoFocusError::ColumnNotFound {
        axis,
        aliases: aliases.join(", "),
    })
}

/// Count occurrences of exact (lat, lng) pairs, output sorted by position.
fn group_positions(positions: impl Iterator<Item = (f64, f64)>) -> Vec<WeightedPoint> {
    let mut counts: HashMap<(u64, u64), (f64, f64, usize)> = HashMap::new();
    for (lat, lng) in positions {
        let entry = counts
            .entry((lat.to_bits(), lng.to_bits()))
            .or_insert((lat, lng, 0));
        entry.2 += 1;
    }

    let mut weighted: Vec<WeightedPoint> = counts
        .into_values()
        .map(|(latitude, longitude, weight)| WeightedPoint {
            latitude,
            longitude,
            weight,
        })
        .collect();

    weighted.sort_by(|a, b| {
        a.latitude
            .total_cmp(&b.latitude)
            .then(a.longitude.total_cmp(&b.longitude))
    });
    weighted
}
