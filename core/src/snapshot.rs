//! View snapshot: the full state a UI needs to draw the map view.

use crate::{
    config::MapCenter,
    spot::{OccupancySummary, ParkingSpot},
    types::{AreaKey, Generation, Tick, Timestamp},
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ViewSnapshot {
    pub area:       Option<AreaKey>,
    pub generation: Generation,
    pub center:     Option<MapCenter>,
    pub tick:       Tick,
    pub now:        Timestamp,
    pub paused:     bool,
    pub summary:    OccupancySummary,
    pub spots:      Vec<ParkingSpot>,
    /// Areas the location picker offers.
    pub areas:      Vec<AreaKey>,
}
