//! Marker reconciler: keeps a rendering surface in step with the spot set.
//!
//! Design:
//!   - State is only the id → rendered-marker map. Nothing else.
//!   - `diff` is pure. It emits every Remove first,
//!     then Add / UpdateStyle in the order of the new spot list.
//!   - A spot whose status is unchanged produces no op at all.
//!   - An id that reappears at a different position is removed and
//!     re-added. Positions are never patched in place.
//!   - Tick results and area swaps are diffed the same way.
//!   - Duplicate ids in the new spot list are not supported.

use crate::{
    render::{MarkerHandle, MarkerStyle, PopupContent, RenderSurface},
    spot::{LatLng, ParkingSpot, SpotStatus},
    types::SpotId,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RenderOp {
    Remove { spot_id: SpotId },
    Add { spot: ParkingSpot },
    UpdateStyle { spot_id: SpotId, spot: ParkingSpot },
}

impl RenderOp {
    pub fn spot_id(&self) -> &str {
        match self {
            Self::Remove { spot_id } | Self::UpdateStyle { spot_id, .. } => spot_id,
            Self::Add { spot } => &spot.id,
        }
    }
}

/// Counts of each op kind in one reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub added:   usize,
    pub updated: usize,
    pub removed: usize,
}

impl ReconcileStats {
    pub fn of(ops: &[RenderOp]) -> Self {
        ops.iter().fold(Self::default(), |mut stats, op| {
            match op {
                RenderOp::Remove { .. }      => stats.removed += 1,
                RenderOp::Add { .. }         => stats.added += 1,
                RenderOp::UpdateStyle { .. } => stats.updated += 1,
            }
            stats
        })
    }

    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.removed == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMarker {
    pub handle:   MarkerHandle,
    pub status:   SpotStatus,
    pub position: LatLng,
}

#[derive(Debug, Default)]
pub struct MarkerReconciler {
    rendered: BTreeMap<SpotId, RenderedMarker>,
}

impl MarkerReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rendered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty()
    }

    pub fn rendered(&self, spot_id: &str) -> Option<&RenderedMarker> {
        self.rendered.get(spot_id)
    }

    /// Compute the ops that take the rendered markers to `new_spots`.
    pub fn diff(&self, new_spots: &[ParkingSpot]) -> Vec<RenderOp> {
        let incoming: HashSet<&str> = new_spots.iter().map(|s| s.id.as_str()).collect();

        let mut removes = Vec::new();
        let mut upserts = Vec::new();

        for id in self.rendered.keys() {
            if !incoming.contains(id.as_str()) {
                removes.push(RenderOp::Remove { spot_id: id.clone() });
            }
        }

        for spot in new_spots {
            match self.rendered.get(&spot.id) {
                None => upserts.push(RenderOp::Add { spot: spot.clone() }),
                Some(marker) if marker.position != spot.position => {
                    removes.push(RenderOp::Remove { spot_id: spot.id.clone() });
                    upserts.push(RenderOp::Add { spot: spot.clone() });
                }
                Some(marker) if marker.status != spot.status => {
                    upserts.push(RenderOp::UpdateStyle {
                        spot_id: spot.id.clone(),
                        spot:    spot.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        removes.extend(upserts);
        removes
    }

    /// Apply ops to the surface and record the result.
    pub fn apply(&mut self, ops: &[RenderOp], surface: &mut dyn RenderSurface) {
        for op in ops {
            match op {
                RenderOp::Remove { spot_id } => match self.rendered.remove(spot_id) {
                    Some(marker) => surface.remove_marker(marker.handle),
                    None => log::warn!("reconciler: remove for unrendered spot '{spot_id}'"),
                },
                RenderOp::Add { spot } => {
                    if let Some(stale) = self.rendered.remove(&spot.id) {
                        log::warn!("reconciler: add for already rendered spot '{}'", spot.id);
                        surface.remove_marker(stale.handle);
                    }
                    let handle = surface.add_marker(
                        &spot.id,
                        spot.position,
                        &MarkerStyle::for_status(spot.status),
                        &PopupContent::for_spot(spot),
                    );
                    self.rendered.insert(
                        spot.id.clone(),
                        RenderedMarker {
                            handle,
                            status:   spot.status,
                            position: spot.position,
                        },
                    );
                }
                RenderOp::UpdateStyle { spot_id, spot } => match self.rendered.get_mut(spot_id) {
                    Some(marker) => {
                        surface.update_marker(
                            marker.handle,
                            &MarkerStyle::for_status(spot.status),
                            &PopupContent::for_spot(spot),
                        );
                        marker.status = spot.status;
                    }
                    None => log::warn!("reconciler: update for unrendered spot '{spot_id}'"),
                },
            }
        }
    }

    /// Diff against `new_spots`, apply, and return what was done.
    pub fn reconcile(
        &mut self,
        new_spots: &[ParkingSpot],
        surface: &mut dyn RenderSurface,
    ) -> Vec<RenderOp> {
        let ops = self.diff(new_spots);
        self.apply(&ops, surface);
        ops
    }

    /// Remove every marker. Returns how many were removed.
    pub fn teardown(&mut self, surface: &mut dyn RenderSurface) -> usize {
        let removed = self.rendered.len();
        for (_, marker) in std::mem::take(&mut self.rendered) {
            surface.remove_marker(marker.handle);
        }
        removed
    }
}
