//! Rendering surface contract and marker presentation.
//!
//! The engine never talks to a mapping library directly. Anything that
//! can add, restyle and remove a marker can host the view.

use crate::{
    spot::{LatLng, ParkingSpot, SpotStatus},
    types::SpotId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque handle to a marker, issued by the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarkerHandle(pub u64);

/// Marker visuals. Derived from status alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerStyle {
    pub fill: &'static str,
}

impl MarkerStyle {
    pub fn for_status(status: SpotStatus) -> Self {
        Self { fill: status.color() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopupContent {
    pub name:         String,
    pub status_label: &'static str,
    /// `HH:MM:SS` of the last status change, in the viewer's local time.
    pub last_updated: String,
}

impl PopupContent {
    pub fn for_spot(spot: &ParkingSpot) -> Self {
        Self {
            name:         spot.name.clone(),
            status_label: spot.status.label(),
            last_updated: spot
                .last_updated
                .with_timezone(&chrono::Local)
                .format("%H:%M:%S")
                .to_string(),
        }
    }
}

/// The three calls a map widget must support.
pub trait RenderSurface {
    fn add_marker(
        &mut self,
        spot_id: &str,
        position: LatLng,
        style: &MarkerStyle,
        popup: &PopupContent,
    ) -> MarkerHandle;

    fn update_marker(&mut self, handle: MarkerHandle, style: &MarkerStyle, popup: &PopupContent);

    fn remove_marker(&mut self, handle: MarkerHandle);
}

/// A marker as currently drawn on a `RecordingSurface`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawnMarker {
    pub spot_id:  SpotId,
    pub position: LatLng,
    pub style:    MarkerStyle,
    pub popup:    PopupContent,
}

/// Every call a `RecordingSurface` has received, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum SurfaceCall {
    Add { handle: MarkerHandle, spot_id: SpotId },
    Update { handle: MarkerHandle },
    Remove { handle: MarkerHandle },
}

/// In-memory surface. Keeps the drawn markers and a call log so
/// runs can be inspected without a map widget.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    markers:     BTreeMap<MarkerHandle, DrawnMarker>,
    calls:       Vec<SurfaceCall>,
    next_handle: u64,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markers(&self) -> impl Iterator<Item = &DrawnMarker> {
        self.markers.values()
    }

    pub fn marker_for(&self, spot_id: &str) -> Option<&DrawnMarker> {
        self.markers.values().find(|m| m.spot_id == spot_id)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// (adds, updates, removes) received so far.
    pub fn call_counts(&self) -> (usize, usize, usize) {
        self.calls.iter().fold((0, 0, 0), |(a, u, r), call| match call {
            SurfaceCall::Add { .. }    => (a + 1, u, r),
            SurfaceCall::Update { .. } => (a, u + 1, r),
            SurfaceCall::Remove { .. } => (a, u, r + 1),
        })
    }
}

impl RenderSurface for RecordingSurface {
    fn add_marker(
        &mut self,
        spot_id: &str,
        position: LatLng,
        style: &MarkerStyle,
        popup: &PopupContent,
    ) -> MarkerHandle {
        self.next_handle += 1;
        let handle = MarkerHandle(self.next_handle);
        self.markers.insert(
            handle,
            DrawnMarker {
                spot_id: spot_id.to_string(),
                position,
                style: style.clone(),
                popup: popup.clone(),
            },
        );
        self.calls.push(SurfaceCall::Add { handle, spot_id: spot_id.to_string() });
        handle
    }

    fn update_marker(&mut self, handle: MarkerHandle, style: &MarkerStyle, popup: &PopupContent) {
        if let Some(marker) = self.markers.get_mut(&handle) {
            marker.style = style.clone();
            marker.popup = popup.clone();
        }
        self.calls.push(SurfaceCall::Update { handle });
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        self.markers.remove(&handle);
        self.calls.push(SurfaceCall::Remove { handle });
    }
}
