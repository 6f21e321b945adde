//! Parking spot records and their occupancy status.

use crate::types::{SpotId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SpotStatus {
    Available,
    Occupied,
}

impl SpotStatus {
    /// The only other state. Status never passes through anything else.
    pub fn toggled(self) -> Self {
        match self {
            Self::Available => Self::Occupied,
            Self::Occupied  => Self::Available,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Occupied  => "Occupied",
        }
    }

    /// Marker fill: success green for free spots, alert red for taken ones.
    pub fn color(self) -> &'static str {
        match self {
            Self::Available => "#10b981",
            Self::Occupied  => "#ef4444",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParkingSpot {
    pub id:           SpotId,
    pub name:         String,
    pub position:     LatLng,
    pub status:       SpotStatus,
    pub last_updated: Timestamp,
}

impl ParkingSpot {
    /// Same spot with the other status, stamped at `now`.
    pub fn flipped(&self, now: Timestamp) -> Self {
        Self {
            status: self.status.toggled(),
            last_updated: now,
            ..self.clone()
        }
    }
}

/// Counts shown in the map's stats panel.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OccupancySummary {
    pub available: usize,
    pub occupied:  usize,
    pub total:     usize,
}

impl OccupancySummary {
    pub fn of(spots: &[ParkingSpot]) -> Self {
        let available = spots
            .iter()
            .filter(|s| s.status == SpotStatus::Available)
            .count();
        Self {
            available,
            occupied: spots.len() - available,
            total: spots.len(),
        }
    }
}
