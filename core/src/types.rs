//! Shared primitive types used across the engine.

/// A simulation tick counter. One tick = one occupancy update.
pub type Tick = u64;

/// Wall-clock instant attached to spot updates.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A stable, unique identifier for a parking spot within an area.
pub type SpotId = String;

/// The key of an area in the catalog (a city name).
pub type AreaKey = String;

/// Count of successful area loads. Identifies which spot set a
/// tick was computed from.
pub type Generation = u64;
