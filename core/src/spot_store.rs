//! Spot store: the authoritative spot set for the active area, and the
//! tick function that simulates live occupancy.
//!
//! RULES:
//!   - An area load either succeeds for every spot or changes nothing.
//!   - Loading replaces the active set wholesale. Nothing carries over.
//!   - `tick` is pure: it reads spots and draws, and returns new spots.
//!     Applying the result is the caller's job, via `replace_spots`.

use crate::{
    config::{AreaCatalog, AreaConfig},
    error::{SimError, SimResult},
    rng::RandomSource,
    spot::{OccupancySummary, ParkingSpot},
    types::{AreaKey, Generation, Timestamp},
};
use std::collections::HashSet;

/// The spot set currently shown, tagged with the load that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveArea {
    pub key:        AreaKey,
    pub generation: Generation,
    pub spots:      Vec<ParkingSpot>,
}

pub struct SpotStore {
    catalog:    AreaCatalog,
    active:     Option<ActiveArea>,
    generation: Generation,
}

impl SpotStore {
    pub fn new(catalog: AreaCatalog) -> Self {
        Self {
            catalog,
            active: None,
            generation: 0,
        }
    }

    pub fn catalog(&self) -> &AreaCatalog {
        &self.catalog
    }

    pub fn active(&self) -> Option<&ActiveArea> {
        self.active.as_ref()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Load an area's spots, stamped at `now`, and make them the active set.
    /// On error the previously active set is left untouched.
    pub fn load_area(&mut self, area_key: &str, now: Timestamp) -> SimResult<Vec<ParkingSpot>> {
        let area = self
            .catalog
            .get(area_key)
            .ok_or_else(|| SimError::UnknownArea { area: area_key.to_string() })?;

        let spots = materialize(area, now)?;

        self.generation += 1;
        self.active = Some(ActiveArea {
            key:        area.key.clone(),
            generation: self.generation,
            spots:      spots.clone(),
        });

        log::info!(
            "spot_store: loaded area '{}' ({} spots, generation {})",
            area_key,
            spots.len(),
            self.generation
        );
        Ok(spots)
    }

    /// Apply a tick result. Rejected (returns false) when `generation` is
    /// no longer the active one, i.e. the area changed since the tick began.
    pub fn replace_spots(&mut self, generation: Generation, spots: Vec<ParkingSpot>) -> bool {
        match self.active.as_mut() {
            Some(active) if active.generation == generation => {
                active.spots = spots;
                true
            }
            _ => false,
        }
    }

    /// Drop the active set (view teardown).
    pub fn clear(&mut self) {
        self.active = None;
    }

    pub fn summary(&self) -> OccupancySummary {
        self.active
            .as_ref()
            .map(|a| OccupancySummary::of(&a.spots))
            .unwrap_or_default()
    }
}

/// Validate an area and build its spot list. Any bad seed fails the load.
fn materialize(area: &AreaConfig, now: Timestamp) -> SimResult<Vec<ParkingSpot>> {
    let mut seen = HashSet::with_capacity(area.spots.len());
    let mut spots = Vec::with_capacity(area.spots.len());

    for seed in &area.spots {
        if !seen.insert(seed.id.as_str()) {
            return Err(SimError::DuplicateSpotId {
                area:    area.key.clone(),
                spot_id: seed.id.clone(),
            });
        }

        let position = seed.position().ok_or_else(|| SimError::MissingCoordinates {
            area:    area.key.clone(),
            spot_id: seed.id.clone(),
        })?;
        if !position.is_valid() {
            return Err(SimError::InvalidCoordinates {
                area:    area.key.clone(),
                spot_id: seed.id.clone(),
                lat:     position.lat,
                lng:     position.lng,
            });
        }

        spots.push(ParkingSpot {
            id:           seed.id.clone(),
            name:         seed.name.clone(),
            position,
            status:       seed.status,
            last_updated: now,
        });
    }

    Ok(spots)
}

/// Advance occupancy by one step.
///
/// Draws exactly one value per spot, in order. A draw below
/// `flip_probability` toggles that spot and stamps it with `now`;
/// every other spot passes through unchanged.
pub fn tick<R: RandomSource + ?Sized>(
    spots: &[ParkingSpot],
    rng: &mut R,
    flip_probability: f64,
    now: Timestamp,
) -> Vec<ParkingSpot> {
    spots
        .iter()
        .map(|spot| {
            if rng.next_uniform() < flip_probability {
                spot.flipped(now)
            } else {
                spot.clone()
            }
        })
        .collect()
}
