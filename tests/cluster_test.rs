//! Integration tests for the clustering engine

use chrono::{TimeZone, Utc};
use geofocus::projection::{metric_to_geographic, project_to_metric, Crs};
use geofocus::{
    cluster_signals, ClusterParams, SignalCollection, SignalRecord, NOISE_LABEL,
};

fn record(id: &str, lat: f64, lng: f64) -> SignalRecord {
    SignalRecord::new(
        Utc.timestamp_millis_opt(0).unwrap(),
        id,
        "10.0.0.1",
        lat,
        lng,
        "red",
    )
}

/// Points within a few meters of an anchor position.
fn blob(id: &str, lat: f64, lng: f64, count: usize) -> Vec<SignalRecord> {
    (0..count)
        .map(|i| record(id, lat + i as f64 * 1e-6, lng + i as f64 * 1e-6))
        .collect()
}

#[test]
fn test_labels_globally_unique_across_identities() {
    // Two devices, two well-separated blobs each.
    let mut records = blob("dev-a", 51.5074, -0.1278, 5);
    records.extend(blob("dev-a", 51.5274, -0.1278, 5));
    records.extend(blob("dev-b", 51.5074, -0.1278, 5));
    records.extend(blob("dev-b", 51.5274, -0.1278, 5));

    let signals = SignalCollection::from_records(records);
    let params = ClusterParams::new(50.0, 3).unwrap();
    let outcome = cluster_signals(&signals, &params).unwrap();

    let labels_for = |id: &str| -> std::collections::BTreeSet<i64> {
        outcome
            .labeled
            .iter()
            .filter(|l| l.record.registration_id == id)
            .map(|l| l.cluster)
            .collect()
    };

    let a = labels_for("dev-a");
    let b = labels_for("dev-b");

    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 2);
    assert!(a.is_disjoint(&b));

    // Identities are processed in sorted order with a monotonic counter.
    assert_eq!(a, [0i64, 1].into_iter().collect());
    assert_eq!(b, [2i64, 3].into_iter().collect());
}

#[test]
fn test_no_noise_labels_in_output() {
    let mut records = blob("dev-a", 51.5074, -0.1278, 5);
    records.push(record("dev-a", 51.9, -0.5)); // isolated outlier

    let signals = SignalCollection::from_records(records);
    let params = ClusterParams::new(50.0, 3).unwrap();
    let outcome = cluster_signals(&signals, &params).unwrap();

    assert_eq!(outcome.labeled.len(), 5);
    assert!(outcome.labeled.iter().all(|l| l.cluster != NOISE_LABEL));
}

#[test]
fn test_centroid_is_mean_of_metric_coordinates() {
    let records = blob("dev-a", 51.5074, -0.1278, 6);
    let signals = SignalCollection::from_records(records.clone());

    let params = ClusterParams::new(50.0, 2).unwrap();
    let outcome = cluster_signals(&signals, &params).unwrap();
    assert_eq!(outcome.centroids.len(), 1);

    // Expected centroid: mean of the projected coordinates.
    let projected: Vec<_> = records
        .iter()
        .map(|r| project_to_metric(Crs::Wgs84, r.latitude, r.longitude).unwrap())
        .collect();
    let mean_x = projected.iter().map(|p| p.x).sum::<f64>() / projected.len() as f64;
    let mean_y = projected.iter().map(|p| p.y).sum::<f64>() / projected.len() as f64;
    let (expected_lat, expected_lng) =
        metric_to_geographic(geofocus::ProjectedPoint::new(mean_x, mean_y));

    let centroid = &outcome.centroids[0];
    assert!((centroid.latitude - expected_lat).abs() < 1e-9);
    assert!((centroid.longitude - expected_lng).abs() < 1e-9);
    assert_eq!(centroid.point_count, 6);
}

#[test]
fn test_all_sparse_group_yields_no_centroids() {
    // Every point farther than eps from every other, min_samples >= 2.
    let records = vec![
        record("dev-a", 51.50, -0.10),
        record("dev-a", 51.60, -0.10),
        record("dev-a", 51.70, -0.10),
        record("dev-a", 51.80, -0.10),
    ];
    let signals = SignalCollection::from_records(records);

    let params = ClusterParams::new(100.0, 2).unwrap();
    let outcome = cluster_signals(&signals, &params).unwrap();

    assert!(outcome.labeled.is_empty());
    assert!(outcome.centroids.is_empty());
}

#[test]
fn test_group_smaller_than_min_samples_is_noise_not_error() {
    let signals = SignalCollection::from_records(blob("dev-a", 51.5, -0.12, 2));
    let params = ClusterParams::new(50.0, 5).unwrap();
    let outcome = cluster_signals(&signals, &params).unwrap();

    assert!(outcome.labeled.is_empty());
    assert!(outcome.centroids.is_empty());
}

#[test]
fn test_buffer_vertices_at_fixed_radius() {
    let signals = SignalCollection::from_records(blob("dev-a", 51.5074, -0.1278, 4));
    let params = ClusterParams::new(50.0, 2).unwrap();
    let outcome = cluster_signals(&signals, &params).unwrap();

    let centroid = &outcome.centroids[0];
    let center = project_to_metric(Crs::Wgs84, centroid.latitude, centroid.longitude).unwrap();

    // Skip the closing vertex (a repeat of the first).
    for vertex in &centroid.buffer[..centroid.buffer.len() - 1] {
        let [lng, lat] = vertex;
        let point = project_to_metric(Crs::Wgs84, *lat, *lng).unwrap();
        let distance = point.distance_sq(&center).sqrt();
        assert!(
            (distance - 250.0).abs() < 1e-6,
            "buffer vertex at {distance} m from centroid"
        );
    }
}

#[test]
fn test_identity_groups_never_merge() {
    // Two devices at the same position: together they'd pass min_samples,
    // alone neither does.
    let mut records = blob("dev-a", 51.5074, -0.1278, 2);
    records.extend(blob("dev-b", 51.5074, -0.1278, 2));
    let signals = SignalCollection::from_records(records);

    let params = ClusterParams::new(50.0, 4).unwrap();
    let outcome = cluster_signals(&signals, &params).unwrap();

    assert!(outcome.labeled.is_empty());
    assert!(outcome.centroids.is_empty());
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_matches_sequential() {
    let mut records = blob("dev-a", 51.5074, -0.1278, 8);
    records.extend(blob("dev-b", 48.8566, 2.3522, 8));
    records.extend(blob("dev-c", 35.6762, 139.6503, 3));
    let signals = SignalCollection::from_records(records);

    let params = ClusterParams::new(50.0, 3).unwrap();
    let sequential = cluster_signals(&signals, &params).unwrap();
    let parallel = geofocus::cluster_signals_parallel(&signals, &params).unwrap();

    assert_eq!(sequential, parallel);
}
