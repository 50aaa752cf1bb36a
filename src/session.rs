//! Session-level orchestration with result caching.
//!
//! An [`AnalysisSession`] owns one ingested and indexed batch and answers
//! the dashboard's queries. Clustering is the expensive derivation, so its
//! results are cached keyed by the full parameter set (filter params, eps,
//! min_samples) with a one-day expiry; everything else recomputes cheaply
//! on demand. Invocations are independent and synchronous; a cache miss
//! blocks the caller until the result is ready.

use std::path::Path;

use log::{debug, info};

use crate::aggregate::{
    heatmap_weights_from_signals, hour_weekday_counts, summary_stats, top_devices, CellCount,
    DeviceCount, HourWeekdayCount, SummaryStats, WeightedPoint,
};
use crate::cache::TtlCache;
use crate::cluster::{cluster_signals, ClusterParams, ClusteringOutcome};
use crate::error::Result;
use crate::export;
use crate::filter::FilterParams;
use crate::hexgrid::IndexedCollection;
use crate::ingest::load_signals;
use crate::SignalCollection;

/// Cache key for one clustering run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClusterKey {
    filter: FilterParams,
    eps_bits: u64,
    min_samples: usize,
}

/// One uploaded batch plus its derived state and result caches.
pub struct AnalysisSession {
    indexed: IndexedCollection,
    cluster_cache: TtlCache<ClusterKey, ClusteringOutcome>,
}

impl AnalysisSession {
    /// Ingest, normalize and index signal export files.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        Self::from_collection(load_signals(paths)?)
    }

    /// Index an already-normalized collection.
    pub fn from_collection(signals: SignalCollection) -> Result<Self> {
        let indexed = IndexedCollection::from_collection(signals)?;
        info!("session ready with {} signals", indexed.len());
        Ok(Self {
            indexed,
            cluster_cache: TtlCache::new(),
        })
    }

    /// The normalized signal collection.
    pub fn signals(&self) -> &SignalCollection {
        self.indexed.signals()
    }

    /// The collection with its hex-cell columns.
    pub fn indexed(&self) -> &IndexedCollection {
        &self.indexed
    }

    /// Headline statistics over the whole batch.
    pub fn summary(&self) -> SummaryStats {
        summary_stats(self.signals())
    }

    /// The `n` most frequent identities.
    pub fn top_devices(&self, n: usize) -> Vec<DeviceCount> {
        top_devices(self.signals(), n)
    }

    /// Hour x weekday histogram over the whole batch.
    pub fn hour_weekday(&self) -> Vec<HourWeekdayCount> {
        hour_weekday_counts(self.signals())
    }

    /// Filtered view of the batch, cell columns carried along.
    pub fn filtered(&self, params: &FilterParams) -> IndexedCollection {
        self.indexed.filter(params)
    }

    /// Per-cell counts over the filtered batch at a resolution.
    pub fn cell_counts(&self, params: &FilterParams, resolution: u8) -> Result<Vec<CellCount>> {
        crate::aggregate::count_by_cell(&self.filtered(params), resolution)
    }

    /// Heatmap weights over the filtered batch.
    pub fn heatmap(&self, params: &FilterParams) -> Vec<WeightedPoint> {
        heatmap_weights_from_signals(self.filtered(params).signals())
    }

    /// Cluster the filtered batch, reusing a cached result when the exact
    /// (filter, eps, min_samples) combination was computed within the TTL.
    pub fn clusters(
        &mut self,
        filter: &FilterParams,
        params: &ClusterParams,
    ) -> Result<ClusteringOutcome> {
        let key = ClusterKey {
            filter: filter.clone(),
            eps_bits: params.eps_bits(),
            min_samples: params.min_samples(),
        };

        if let Some(cached) = self.cluster_cache.get(&key) {
            debug!("clustering cache hit");
            return Ok(cached.clone());
        }

        debug!("clustering cache miss, running DBSCAN");
        let filtered = self.indexed.filter(filter);
        let outcome = cluster_signals(filtered.signals(), params)?;
        self.cluster_cache.insert(key, outcome.clone());
        Ok(outcome)
    }

    /// CSV export of the whole indexed batch.
    pub fn export_csv(&self) -> Result<String> {
        export::export_csv(&self.indexed)
    }

    /// KML export of the whole batch.
    pub fn export_kml(&self) -> String {
        export::export_kml(self.signals())
    }
}
