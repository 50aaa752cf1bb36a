//! Per-device DBSCAN clustering over projected coordinates.
//!
//! Records are projected onto the metric plane, partitioned by identity,
//! and clustered independently per device: spatial clusters are only
//! meaningful within one device's trail, never across devices. Each
//! group's local DBSCAN labels are remapped to globally unique cluster
//! ids by folding an explicit counter through the groups in identity
//! order, so labels are never reused between devices.
//!
//! Neighborhood queries run against an R-tree of the group's projected
//! points, which keeps the expansion step out of the quadratic regime for
//! dense trails.

use std::collections::{BTreeMap, HashMap, VecDeque};

use log::{debug, info};
use rstar::{primitives::GeomWithData, RTree};
use serde::Serialize;

use crate::error::{GeoFocusError, Result};
use crate::projection::{metric_to_geographic, project_to_metric, Crs, ProjectedPoint};
use crate::{SignalCollection, SignalRecord};

/// Label assigned to unclustered (noise) rows.
pub const NOISE_LABEL: i64 = -1;

/// Buffer disk radius around each centroid, in metric-plane meters.
///
/// Fixed regardless of `eps`.
pub const BUFFER_RADIUS_METERS: f64 = 250.0;

/// Segments approximating the buffer disk. The ring is closed, so it
/// carries `BUFFER_SEGMENTS + 1` vertices.
const BUFFER_SEGMENTS: usize = 32;

/// Internal marker for rows DBSCAN has not visited yet.
const UNVISITED: i64 = -2;

/// Validated DBSCAN parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    eps: f64,
    min_samples: usize,
}

impl ClusterParams {
    /// Create parameters, rejecting `eps <= 0` and `min_samples < 1`.
    pub fn new(eps: f64, min_samples: usize) -> Result<Self> {
        if !eps.is_finite() || eps <= 0.0 {
            return Err(GeoFocusError::invalid_argument(format!(
                "eps must be a positive distance in meters, got {eps}"
            )));
        }
        if min_samples < 1 {
            return Err(GeoFocusError::invalid_argument(
                "min_samples must be at least 1",
            ));
        }
        Ok(Self { eps, min_samples })
    }

    /// Neighborhood radius in metric-plane meters.
    pub fn eps(&self) -> f64 {
        self.eps
    }

    /// Minimum neighborhood size (including the point itself) for a core point.
    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// Bit pattern of `eps`, for use in hashable cache keys.
    pub fn eps_bits(&self) -> u64 {
        self.eps.to_bits()
    }
}

/// A signal record annotated with its global cluster label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledSignal {
    #[serde(flatten)]
    pub record: SignalRecord,
    /// Globally unique cluster id (never [`NOISE_LABEL`]; noise rows are
    /// excluded from the output).
    pub cluster: i64,
}

/// Centroid and buffer for one (identity, cluster) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterCentroid {
    pub registration_id: String,
    pub cluster: i64,
    /// Number of member signals.
    pub point_count: usize,
    /// Centroid position converted back to geographic degrees.
    pub latitude: f64,
    pub longitude: f64,
    /// Closed ring approximating a disk of [`BUFFER_RADIUS_METERS`] around
    /// the centroid, as `[longitude, latitude]` pairs with the first
    /// vertex repeated at the end.
    pub buffer: Vec<[f64; 2]>,
}

/// Result of one clustering run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusteringOutcome {
    /// Non-noise rows with their global labels, grouped by identity in
    /// sorted order, original row order within each identity.
    pub labeled: Vec<LabeledSignal>,
    /// One centroid per non-empty (identity, cluster) pair, in global
    /// label order.
    pub centroids: Vec<ClusterCentroid>,
}

/// One identity's rows with their projected coordinates.
struct IdentityGroup<'a> {
    identity: &'a str,
    /// Indices into the source collection, in original order.
    row_indices: Vec<usize>,
    points: Vec<ProjectedPoint>,
}

/// Cluster a (typically filtered) signal collection.
///
/// A group with fewer than `min_samples` points is all noise, which is not
/// an error; an empty input produces empty outputs.
pub fn cluster_signals(
    signals: &SignalCollection,
    params: &ClusterParams,
) -> Result<ClusteringOutcome> {
    let (projected, groups) = prepare_groups(signals)?;
    let local_labels: Vec<Vec<i64>> = groups
        .iter()
        .map(|group| dbscan(&group.points, params))
        .collect();
    assemble_outcome(signals, &projected, &groups, local_labels)
}

/// Parallel variant: per-group DBSCAN runs concurrently, then the label
/// fold proceeds sequentially in identity order. Results are identical to
/// [`cluster_signals`].
#[cfg(feature = "parallel")]
pub fn cluster_signals_parallel(
    signals: &SignalCollection,
    params: &ClusterParams,
) -> Result<ClusteringOutcome> {
    use rayon::prelude::*;

    let (projected, groups) = prepare_groups(signals)?;
    let local_labels: Vec<Vec<i64>> = groups
        .par_iter()
        .map(|group| dbscan(&group.points, params))
        .collect();
    assemble_outcome(signals, &projected, &groups, local_labels)
}

/// Project every record and partition row indices by identity.
fn prepare_groups(
    signals: &SignalCollection,
) -> Result<(Vec<ProjectedPoint>, Vec<IdentityGroup<'_>>)> {
    let mut projected = Vec::with_capacity(signals.len());
    for record in signals {
        projected.push(project_to_metric(
            Crs::Wgs84,
            record.latitude,
            record.longitude,
        )?);
    }

    let mut by_identity: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, record) in signals.iter().enumerate() {
        by_identity
            .entry(record.registration_id.as_str())
            .or_default()
            .push(index);
    }

    let groups = by_identity
        .into_iter()
        .map(|(identity, row_indices)| {
            let points = row_indices.iter().map(|&i| projected[i]).collect();
            IdentityGroup {
                identity,
                row_indices,
                points,
            }
        })
        .collect();

    Ok((projected, groups))
}

/// Remap local labels to global ones, collect labeled rows and centroids.
///
/// The global label counter is threaded through the fold explicitly; each
/// newly observed local cluster takes the next value in encounter order.
fn assemble_outcome(
    signals: &SignalCollection,
    projected: &[ProjectedPoint],
    groups: &[IdentityGroup<'_>],
    local_labels: Vec<Vec<i64>>,
) -> Result<ClusteringOutcome> {
    let records = signals.records();
    let mut labeled = Vec::new();
    let mut centroids = Vec::new();
    let mut next_label: i64 = 0;

    for (group, locals) in groups.iter().zip(local_labels) {
        let mut mapping: HashMap<i64, i64> = HashMap::new();
        for &local in &locals {
            if local != NOISE_LABEL && !mapping.contains_key(&local) {
                mapping.insert(local, next_label);
                next_label += 1;
            }
        }

        // Accumulate per-cluster sums in the metric plane.
        let mut sums: BTreeMap<i64, (f64, f64, usize)> = BTreeMap::new();

        let mut noise_rows = 0usize;
        for (&row, &local) in group.row_indices.iter().zip(&locals) {
            let Some(&global) = mapping.get(&local) else {
                noise_rows += 1;
                continue;
            };

            labeled.push(LabeledSignal {
                record: records[row].clone(),
                cluster: global,
            });

            let point = projected[row];
            let entry = sums.entry(global).or_insert((0.0, 0.0, 0));
            entry.0 += point.x;
            entry.1 += point.y;
            entry.2 += 1;
        }

        debug!(
            "identity {}: {} clusters, {} noise rows",
            group.identity,
            mapping.len(),
            noise_rows
        );

        for (cluster, (sum_x, sum_y, point_count)) in sums {
            let center = ProjectedPoint::new(
                sum_x / point_count as f64,
                sum_y / point_count as f64,
            );
            let (latitude, longitude) = metric_to_geographic(center);

            centroids.push(ClusterCentroid {
                registration_id: group.identity.to_string(),
                cluster,
                point_count,
                latitude,
                longitude,
                buffer: buffer_ring(center),
            });
        }
    }

    info!(
        "clustered {} signals into {} clusters across {} identities",
        signals.len(),
        next_label,
        groups.len()
    );

    Ok(ClusteringOutcome { labeled, centroids })
}

/// DBSCAN over one group's projected points. Returns local labels where
/// [`NOISE_LABEL`] marks noise and clusters count up from zero in the
/// order they are first expanded.
fn dbscan(points: &[ProjectedPoint], params: &ClusterParams) -> Vec<i64> {
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }

    let tree = RTree::bulk_load(
        points
            .iter()
            .enumerate()
            .map(|(i, p)| GeomWithData::new([p.x, p.y], i))
            .collect(),
    );
    let eps_sq = params.eps() * params.eps();
    let range_query = |i: usize| -> Vec<usize> {
        tree.locate_within_distance([points[i].x, points[i].y], eps_sq)
            .map(|neighbor| neighbor.data)
            .collect()
    };

    let mut labels = vec![UNVISITED; n];
    let mut cluster: i64 = 0;

    for i in 0..n {
        if labels[i] != UNVISITED {
            continue;
        }

        let neighbors = range_query(i);
        if neighbors.len() < params.min_samples() {
            labels[i] = NOISE_LABEL;
            continue;
        }

        labels[i] = cluster;
        let mut queue: VecDeque<usize> = neighbors.into_iter().collect();

        while let Some(j) = queue.pop_front() {
            if labels[j] == NOISE_LABEL {
                // Border point reachable from a core point.
                labels[j] = cluster;
            }
            if labels[j] != UNVISITED {
                continue;
            }
            labels[j] = cluster;

            let reachable = range_query(j);
            if reachable.len() >= params.min_samples() {
                queue.extend(reachable);
            }
        }

        cluster += 1;
    }

    labels
}

/// Closed ring of `[longitude, latitude]` vertices approximating the
/// buffer disk around a metric-plane center.
fn buffer_ring(center: ProjectedPoint) -> Vec<[f64; 2]> {
    let mut ring: Vec<[f64; 2]> = (0..BUFFER_SEGMENTS)
        .map(|segment| {
            let theta = 2.0 * std::f64::consts::PI * segment as f64 / BUFFER_SEGMENTS as f64;
            let vertex = ProjectedPoint::new(
                center.x + BUFFER_RADIUS_METERS * theta.cos(),
                center.y + BUFFER_RADIUS_METERS * theta.sin(),
            );
            let (latitude, longitude) = metric_to_geographic(vertex);
            [longitude, latitude]
        })
        .collect();

    if let Some(&first) = ring.first() {
        ring.push(first);
    }
    ring
}
