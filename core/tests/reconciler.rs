//! Marker reconciler tests.
//!
//! Covers the minimal-op contract: adds for new spots, style updates
//! only on status change, removes before everything else, and nothing
//! at all once the surface has converged.

use chrono::{Duration, Local, TimeZone, Utc};
use smartpark_core::{
    config::AreaCatalog,
    reconciler::{MarkerReconciler, ReconcileStats, RenderOp},
    render::{RecordingSurface, SurfaceCall},
    spot::{LatLng, ParkingSpot, SpotStatus},
    spot_store::SpotStore,
    types::Timestamp,
};

fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// How a popup shows `at`: wall-clock time in the local zone.
fn clock_face(at: Timestamp) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

fn load(area: &str) -> Vec<ParkingSpot> {
    SpotStore::new(AreaCatalog::builtin()).load_area(area, t0()).unwrap()
}

#[test]
fn first_reconcile_adds_every_spot_with_status_colors() {
    let spots = load("Athens");
    let mut reconciler = MarkerReconciler::new();
    let mut surface = RecordingSurface::new();

    let ops = reconciler.reconcile(&spots, &mut surface);
    assert_eq!(ReconcileStats::of(&ops), ReconcileStats { added: 5, updated: 0, removed: 0 });
    assert_eq!(surface.marker_count(), 5);
    assert_eq!(reconciler.len(), 5);

    let free = surface.marker_for("1").unwrap();
    assert_eq!(free.style.fill, "#10b981");
    assert_eq!(free.popup.status_label, "Available");
    assert_eq!(free.popup.last_updated, clock_face(t0()));
    assert_eq!(free.position, LatLng::new(37.9755, 23.7348));

    let taken = surface.marker_for("2").unwrap();
    assert_eq!(taken.style.fill, "#ef4444");
    assert_eq!(taken.popup.status_label, "Occupied");
}

#[test]
fn reconcile_is_idempotent_after_convergence() {
    let spots = load("Larissa");
    let mut reconciler = MarkerReconciler::new();
    let mut surface = RecordingSurface::new();

    reconciler.reconcile(&spots, &mut surface);
    surface.clear_calls();

    let ops = reconciler.reconcile(&spots, &mut surface);
    assert!(ops.is_empty(), "second reconcile emitted {ops:?}");
    assert!(surface.calls().is_empty());
}

#[test]
fn area_swap_removes_all_then_adds_all() {
    let athens = load("Athens");
    let larissa = load("Larissa");
    let mut reconciler = MarkerReconciler::new();
    let mut surface = RecordingSurface::new();
    reconciler.reconcile(&athens, &mut surface);

    let ops = reconciler.reconcile(&larissa, &mut surface);
    assert_eq!(ops.len(), 10);
    assert!(ops[..5].iter().all(|op| matches!(op, RenderOp::Remove { .. })));
    assert!(ops[5..].iter().all(|op| matches!(op, RenderOp::Add { .. })));
    assert_eq!(ReconcileStats::of(&ops).updated, 0);

    let added: Vec<&str> = ops[5..].iter().map(|op| op.spot_id()).collect();
    assert_eq!(added, vec!["6", "7", "8", "9", "10"]);
    assert_eq!(surface.marker_count(), 5);
    assert!(surface.marker_for("1").is_none());
}

#[test]
fn status_flip_emits_single_update_style() {
    let spots = load("Athens");
    let mut reconciler = MarkerReconciler::new();
    let mut surface = RecordingSurface::new();
    reconciler.reconcile(&spots, &mut surface);
    surface.clear_calls();

    let later = t0() + Duration::seconds(5);
    let mut next = spots.clone();
    next[0] = next[0].flipped(later);
    assert_eq!(next[0].status, SpotStatus::Occupied);

    let ops = reconciler.reconcile(&next, &mut surface);
    assert_eq!(
        ops,
        vec![RenderOp::UpdateStyle { spot_id: "1".into(), spot: next[0].clone() }]
    );
    assert!(matches!(surface.calls(), [SurfaceCall::Update { .. }]));

    let marker = surface.marker_for("1").unwrap();
    assert_eq!(marker.style.fill, "#ef4444");
    assert_eq!(marker.popup.status_label, "Occupied");
    assert_eq!(marker.popup.last_updated, clock_face(t0() + Duration::seconds(5)));
    assert_eq!(reconciler.rendered("1").unwrap().status, SpotStatus::Occupied);
}

#[test]
fn unchanged_status_ignores_other_field_changes() {
    let spots = load("Athens");
    let mut reconciler = MarkerReconciler::new();
    let mut surface = RecordingSurface::new();
    reconciler.reconcile(&spots, &mut surface);

    let mut renamed = spots.clone();
    renamed[2].name = "Renamed".into();
    renamed[2].last_updated = t0() + Duration::minutes(1);
    assert!(reconciler.diff(&renamed).is_empty());
}

#[test]
fn reused_id_at_new_position_is_removed_before_added() {
    let spots = load("Athens");
    let mut reconciler = MarkerReconciler::new();
    let mut surface = RecordingSurface::new();
    reconciler.reconcile(&spots, &mut surface);
    let old_handle = reconciler.rendered("3").unwrap().handle;

    let mut moved = spots.clone();
    moved[2].position = LatLng::new(38.0, 23.8);

    let ops = reconciler.reconcile(&moved, &mut surface);
    assert_eq!(ops.len(), 2);
    assert!(matches!(&ops[0], RenderOp::Remove { spot_id } if spot_id == "3"));
    assert!(matches!(&ops[1], RenderOp::Add { spot } if spot.id == "3"));

    assert_ne!(reconciler.rendered("3").unwrap().handle, old_handle);
    assert_eq!(surface.marker_for("3").unwrap().position, LatLng::new(38.0, 23.8));
    assert_eq!(surface.marker_count(), 5);
}

#[test]
fn partial_overlap_mixes_removes_adds_and_updates() {
    let spots = load("Athens");
    let mut reconciler = MarkerReconciler::new();
    let mut surface = RecordingSurface::new();
    reconciler.reconcile(&spots, &mut surface);

    // Drop spot 5, flip spot 2, bring in a Larissa spot.
    let mut next: Vec<ParkingSpot> = spots[..4].to_vec();
    next[1] = next[1].flipped(t0());
    next.push(load("Larissa")[0].clone());

    let ops = reconciler.diff(&next);
    assert_eq!(
        ops.iter().map(RenderOp::spot_id).collect::<Vec<_>>(),
        vec!["5", "2", "6"]
    );
    assert!(matches!(ops[0], RenderOp::Remove { .. }));
    assert!(matches!(ops[1], RenderOp::UpdateStyle { .. }));
    assert!(matches!(ops[2], RenderOp::Add { .. }));
}

#[test]
fn teardown_removes_every_marker() {
    let spots = load("Larissa");
    let mut reconciler = MarkerReconciler::new();
    let mut surface = RecordingSurface::new();
    reconciler.reconcile(&spots, &mut surface);

    assert_eq!(reconciler.teardown(&mut surface), 5);
    assert!(reconciler.is_empty());
    assert_eq!(surface.marker_count(), 0);
    assert_eq!(surface.call_counts(), (5, 0, 5));
}
