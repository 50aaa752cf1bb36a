//! Multi-resolution hierarchical hexagonal indexing.
//!
//! Every record gets one H3 cell identifier per resolution in 5..=15. Only
//! the finest cell (resolution 15) is computed from raw coordinates; every
//! coarser cell is derived as its ancestor, so the columns nest by
//! construction: `cell(r) == ancestor(cell(15), r)` for all r.

use h3o::{CellIndex, LatLng, Resolution};
use log::info;

use crate::error::{GeoFocusError, Result};
use crate::{SignalCollection, SignalRecord};

/// Coarsest indexed resolution.
pub const MIN_RESOLUTION: u8 = 5;
/// Finest indexed resolution.
pub const MAX_RESOLUTION: u8 = 15;
/// Number of resolution columns per record.
pub const RESOLUTION_COUNT: usize = (MAX_RESOLUTION - MIN_RESOLUTION + 1) as usize;

/// The hierarchical cell column set for one record.
///
/// Slot 0 holds the resolution-5 cell, slot 10 the resolution-15 cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexCells {
    cells: [CellIndex; RESOLUTION_COUNT],
}

impl HexCells {
    /// Compute the full hierarchy for one coordinate pair.
    fn from_coordinates(latitude: f64, longitude: f64, record_index: usize) -> Result<Self> {
        let latlng = LatLng::new(latitude, longitude).map_err(|_| {
            GeoFocusError::CoordinateOutOfRange {
                record_index,
                latitude,
                longitude,
            }
        })?;

        let finest = latlng.to_cell(Resolution::Fifteen);
        let mut cells = [finest; RESOLUTION_COUNT];
        for r in MIN_RESOLUTION..MAX_RESOLUTION {
            let Ok(res) = Resolution::try_from(r) else {
                continue;
            };
            if let Some(parent) = finest.parent(res) {
                cells[(r - MIN_RESOLUTION) as usize] = parent;
            }
        }

        Ok(Self { cells })
    }

    /// The cell at a given resolution, or `None` outside 5..=15.
    pub fn cell(&self, resolution: u8) -> Option<CellIndex> {
        if !(MIN_RESOLUTION..=MAX_RESOLUTION).contains(&resolution) {
            return None;
        }
        Some(self.cells[(resolution - MIN_RESOLUTION) as usize])
    }

    /// The finest (resolution 15) cell.
    pub fn finest(&self) -> CellIndex {
        self.cells[RESOLUTION_COUNT - 1]
    }
}

/// A signal collection augmented with its hierarchical cell columns.
///
/// `cells()[i]` belongs to `signals().records()[i]`. Row subsets produced
/// by [`IndexedCollection::filter`] carry their cells along, so aggregation
/// at any resolution never recomputes geometry.
#[derive(Debug, Clone, Default)]
pub struct IndexedCollection {
    signals: SignalCollection,
    cells: Vec<HexCells>,
}

impl IndexedCollection {
    /// Compute cell columns for every record in the collection.
    ///
    /// Fails with [`GeoFocusError::CoordinateOutOfRange`] if any record's
    /// coordinates are outside the valid geographic range; no partial
    /// collection is returned.
    pub fn from_collection(signals: SignalCollection) -> Result<Self> {
        let mut cells = Vec::with_capacity(signals.len());
        for (index, record) in signals.iter().enumerate() {
            if !record.has_valid_coordinates() {
                return Err(GeoFocusError::CoordinateOutOfRange {
                    record_index: index,
                    latitude: record.latitude,
                    longitude: record.longitude,
                });
            }
            cells.push(HexCells::from_coordinates(
                record.latitude,
                record.longitude,
                index,
            )?);
        }

        info!(
            "indexed {} signals across resolutions {}..={}",
            signals.len(),
            MIN_RESOLUTION,
            MAX_RESOLUTION
        );

        Ok(Self { signals, cells })
    }

    /// The underlying signal collection.
    pub fn signals(&self) -> &SignalCollection {
        &self.signals
    }

    /// The per-record cell columns, parallel to `signals().records()`.
    pub fn cells(&self) -> &[HexCells] {
        &self.cells
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Iterate over (record, cells) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&SignalRecord, &HexCells)> {
        self.signals.iter().zip(self.cells.iter())
    }

    /// Row subset keeping each surviving record's cell columns.
    ///
    /// Purely functional: the input is untouched and row order is preserved.
    pub fn filter(&self, params: &crate::filter::FilterParams) -> IndexedCollection {
        let (records, cells): (Vec<SignalRecord>, Vec<HexCells>) = self
            .iter()
            .filter(|(record, _)| params.matches(record))
            .map(|(record, cells)| (record.clone(), *cells))
            .unzip();

        IndexedCollection {
            signals: SignalCollection::from_records(records),
            cells,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::SignalRecord;

    fn record(lat: f64, lng: f64) -> SignalRecord {
        SignalRecord::new(
            Utc.timestamp_millis_opt(0).unwrap(),
            "dev-1",
            "10.0.0.1",
            lat,
            lng,
            "red",
        )
    }

    #[test]
    fn test_cells_nest() {
        let cells = HexCells::from_coordinates(51.5074, -0.1278, 0).unwrap();

        for r in MIN_RESOLUTION..=MAX_RESOLUTION {
            let cell = cells.cell(r).unwrap();
            assert_eq!(cell.resolution(), Resolution::try_from(r).unwrap());

            // Every coarser cell is the ancestor of the finest cell.
            assert_eq!(
                cells.finest().parent(Resolution::try_from(r).unwrap()),
                Some(cell)
            );
        }
    }

    #[test]
    fn test_resolution_out_of_range() {
        let cells = HexCells::from_coordinates(51.5074, -0.1278, 0).unwrap();
        assert!(cells.cell(4).is_none());
        assert!(cells.cell(16).is_none());
    }

    #[test]
    fn test_invalid_latitude_rejected() {
        let collection = SignalCollection::from_records(vec![record(95.0, 0.0)]);
        let err = IndexedCollection::from_collection(collection).unwrap_err();
        assert!(matches!(
            err,
            crate::GeoFocusError::CoordinateOutOfRange {
                record_index: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_collection() {
        let indexed = IndexedCollection::from_collection(SignalCollection::default()).unwrap();
        assert!(indexed.is_empty());
    }
}
