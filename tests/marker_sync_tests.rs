//! Marker synchronizer behavior against the headless backend

use placelet::core::config::MarkerConfig;
use placelet::core::geo::LatLng;
use placelet::core::place::Place;
use placelet::markers::headless::{BackendOp, HeadlessBackend};
use placelet::markers::MarkerSynchronizer;
use std::time::Duration;

fn place_at(id: i64, lat: f64, lng: f64) -> Place {
    let mut place = Place::new(id, format!("place-{id}"));
    place.position = Some(LatLng::new(lat, lng));
    place
}

fn spread(count: usize) -> Vec<Place> {
    (0..count)
        .map(|i| place_at(i as i64 + 1, 40.0 + i as f64 * 0.1, -74.0 + i as f64 * 0.1))
        .collect()
}

fn instant_config() -> MarkerConfig {
    MarkerConfig {
        rebuild_delay: Duration::ZERO,
        ..MarkerConfig::default()
    }
}

fn sync_pair() -> (MarkerSynchronizer, HeadlessBackend) {
    let backend = HeadlessBackend::new();
    let sync = MarkerSynchronizer::new(Box::new(backend.clone()), instant_config());
    (sync, backend)
}

#[test]
fn test_four_markers_attach_directly() {
    let (mut sync, backend) = sync_pair();
    sync.sync_now(&spread(4));

    assert_eq!(backend.live_marker_count(), 4);
    assert_eq!(backend.attached_count(), 4);
    assert!(backend.cluster_members().is_none());
    assert!(!sync.is_clustered());
}

#[test]
fn test_six_markers_cluster_once() {
    let (mut sync, backend) = sync_pair();
    sync.sync_now(&spread(6));

    assert!(sync.is_clustered());
    assert_eq!(backend.live_marker_count(), 6);
    // Clustered markers render through the overlay, not individually
    assert_eq!(backend.attached_count(), 0);

    let mut members = backend.cluster_members().unwrap();
    members.sort_unstable();
    assert_eq!(members, vec![1, 2, 3, 4, 5, 6]);

    let builds = backend
        .ops()
        .iter()
        .filter(|op| matches!(op, BackendOp::ClusterBuilt { .. }))
        .count();
    assert_eq!(builds, 1);
}

#[test]
fn test_exact_threshold_clusters() {
    let (mut sync, backend) = sync_pair();
    sync.sync_now(&spread(5));
    assert!(sync.is_clustered());
    assert_eq!(backend.cluster_members().unwrap().len(), 5);
}

#[test]
fn test_unready_cluster_library_attaches_directly() {
    let backend = HeadlessBackend::with_cluster_unready();
    let mut sync = MarkerSynchronizer::new(Box::new(backend.clone()), instant_config());

    sync.sync_now(&spread(8));
    assert!(!sync.is_clustered());
    assert_eq!(backend.attached_count(), 8);

    // Once the library loads, the next rebuild clusters
    backend.set_cluster_ready(true);
    sync.sync_now(&spread(8));
    assert!(sync.is_clustered());
    assert_eq!(backend.attached_count(), 0);
}

#[test]
fn test_cluster_failure_falls_back_to_direct_attachment() {
    let (mut sync, backend) = sync_pair();
    backend.fail_next_cluster();

    sync.sync_now(&spread(6));

    // The map must not end up empty
    assert!(!sync.is_clustered());
    assert_eq!(backend.attached_count(), 6);
    assert!(backend.cluster_members().is_none());
}

#[test]
fn test_rebuild_is_idempotent() {
    let (mut sync, backend) = sync_pair();
    let places = spread(6);

    sync.sync_now(&places);
    sync.sync_now(&places);

    assert_eq!(backend.live_marker_count(), 6);
    let mut ids = backend.live_marker_ids();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);

    // The second pass tore everything down before recreating it
    let teardowns = backend
        .ops()
        .iter()
        .filter(|op| matches!(op, BackendOp::ClusterTornDown))
        .count();
    assert_eq!(teardowns, 2);
}

#[test]
fn test_rapid_consecutive_schedules_converge_to_latest() {
    let (mut sync, backend) = sync_pair();

    sync.schedule(&spread(6));
    sync.schedule(&spread(2));
    sync.schedule(&[place_at(42, 44.0, -73.0)]);
    assert!(sync.tick());

    assert_eq!(backend.live_marker_ids(), vec![42]);
    assert!(!sync.is_clustered());
    // Only one rebuild ran; the superseded lists never touched the map
    let creations = backend
        .ops()
        .iter()
        .filter(|op| matches!(op, BackendOp::MarkerCreated(_)))
        .count();
    assert_eq!(creations, 1);
}

#[test]
fn test_invalid_coordinates_excluded_from_map_only() {
    let (mut sync, backend) = sync_pair();
    let mut textual = Place::new(7, "No coordinates");
    textual.position = None;
    let mut off_globe = place_at(8, 95.0, 0.0);
    off_globe.name = "Out of range".to_string();

    let places = vec![place_at(1, 44.0, -73.0), textual, off_globe];
    sync.sync_now(&places);

    assert_eq!(backend.live_marker_count(), 1);
    assert_eq!(backend.live_marker_ids(), vec![1]);
}

#[test]
fn test_single_marker_fit_caps_zoom() {
    let (mut sync, backend) = sync_pair();
    sync.sync_now(&[place_at(1, 44.0, -73.0)]);

    let (bounds, max_zoom) = backend.last_fitted_bounds().unwrap();
    assert!(bounds.is_degenerate());
    assert_eq!(max_zoom, Some(MarkerConfig::default().single_marker_max_zoom));
}

#[test]
fn test_multi_marker_fit_has_no_zoom_cap() {
    let (mut sync, backend) = sync_pair();
    sync.sync_now(&spread(3));

    let (bounds, max_zoom) = backend.last_fitted_bounds().unwrap();
    assert!(!bounds.is_degenerate());
    assert_eq!(max_zoom, None);
    assert!(bounds.contains(&LatLng::new(40.1, -73.9)));
}

#[test]
fn test_empty_rebuild_fits_nothing() {
    let (mut sync, backend) = sync_pair();
    sync.sync_now(&spread(2));
    let fits_before = backend
        .ops()
        .iter()
        .filter(|op| matches!(op, BackendOp::BoundsFitted { .. }))
        .count();

    sync.sync_now(&[]);
    let fits_after = backend
        .ops()
        .iter()
        .filter(|op| matches!(op, BackendOp::BoundsFitted { .. }))
        .count();
    assert_eq!(fits_before, fits_after);
    assert_eq!(backend.live_marker_count(), 0);
}

#[test]
fn test_click_focus_can_be_disabled() {
    let backend = HeadlessBackend::new();
    let config = MarkerConfig {
        click_to_focus: false,
        rebuild_delay: Duration::ZERO,
        ..MarkerConfig::default()
    };
    let mut sync = MarkerSynchronizer::new(Box::new(backend.clone()), config);
    sync.sync_now(&spread(2));
    let viewport_before = backend.viewport();

    backend.simulate_click(1);
    let clicked = sync.pump_events();
    assert_eq!(clicked, vec![1]);
    assert_eq!(sync.selected(), Some(1));
    assert_eq!(backend.viewport(), viewport_before);
}
