use crate::{
    error::{SimError, SimResult},
    spot::{LatLng, SpotStatus},
    types::{AreaKey, SpotId},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_FLIP_PROBABILITY: f64 = 0.10;
pub const DEFAULT_AREA: &str = "Athens";

// ── Simulation parameters ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub tick_interval_ms: u64,
    /// Chance that any single spot flips status on a tick.
    pub flip_probability: f64,
    /// Area shown when the view mounts.
    pub default_area:     AreaKey,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            flip_probability: DEFAULT_FLIP_PROBABILITY,
            default_area:     DEFAULT_AREA.to_string(),
        }
    }
}

impl SimConfig {
    /// Load `{data_dir}/simulation.json`. Missing fields take defaults.
    /// In tests, use SimConfig::default_test().
    pub fn load(data_dir: &str) -> SimResult<Self> {
        let content = std::fs::read_to_string(Path::new(data_dir).join("simulation.json"))?;
        let config: SimConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Config with hardcoded defaults for use in tests.
    pub fn default_test() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.tick_interval_ms == 0 {
            return Err(SimError::InvalidConfig {
                reason: "tick_interval_ms must be > 0".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.flip_probability) {
            return Err(SimError::InvalidConfig {
                reason: format!(
                    "flip_probability must be within [0, 1], got {}",
                    self.flip_probability
                ),
            });
        }
        Ok(())
    }
}

// ── Area catalog ───────────────────────────────────────────────────

/// Where the map centers when an area is shown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MapCenter {
    pub lat:  f64,
    pub lng:  f64,
    pub zoom: u8,
}

/// A spot as written in the catalog. Coordinates are optional here so
/// that a malformed entry is reported at load time instead of failing
/// the whole file parse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpotSeed {
    pub id:     SpotId,
    pub name:   String,
    #[serde(default)]
    pub lat:    Option<f64>,
    #[serde(default)]
    pub lng:    Option<f64>,
    pub status: SpotStatus,
}

impl SpotSeed {
    pub fn new(id: &str, name: &str, lat: f64, lng: f64, status: SpotStatus) -> Self {
        Self {
            id:   id.to_string(),
            name: name.to_string(),
            lat:  Some(lat),
            lng:  Some(lng),
            status,
        }
    }

    pub fn position(&self) -> Option<LatLng> {
        Some(LatLng::new(self.lat?, self.lng?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AreaConfig {
    pub key:    AreaKey,
    pub center: MapCenter,
    pub spots:  Vec<SpotSeed>,
}

#[derive(Debug, Clone, Deserialize)]
struct AreaCatalogFile {
    areas: Vec<AreaConfig>,
}

/// Static area configuration, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaCatalog {
    areas: Vec<AreaConfig>,
}

impl AreaCatalog {
    pub fn new(areas: Vec<AreaConfig>) -> Self {
        Self { areas }
    }

    /// Load `{data_dir}/areas.json`.
    pub fn load(data_dir: &str) -> SimResult<Self> {
        let content = std::fs::read_to_string(Path::new(data_dir).join("areas.json"))?;
        Self::from_json(&content)
    }

    /// Like `load`, but falls back to the built-in catalog when the
    /// data directory has no areas file.
    pub fn load_or_builtin(data_dir: &str) -> SimResult<Self> {
        if Path::new(data_dir).join("areas.json").exists() {
            Self::load(data_dir)
        } else {
            log::info!("catalog: no areas.json in {data_dir}, using built-in areas");
            Ok(Self::builtin())
        }
    }

    pub fn from_json(content: &str) -> SimResult<Self> {
        let file: AreaCatalogFile = serde_json::from_str(content)?;
        Ok(Self::new(file.areas))
    }

    pub fn get(&self, key: &str) -> Option<&AreaConfig> {
        self.areas.iter().find(|a| a.key == key)
    }

    /// Selectable area keys, in declaration order.
    pub fn area_keys(&self) -> Vec<&str> {
        self.areas.iter().map(|a| a.key.as_str()).collect()
    }

    pub fn areas(&self) -> &[AreaConfig] {
        &self.areas
    }

    /// The demo dataset: five spots in each of Athens and Larissa.
    pub fn builtin() -> Self {
        use SpotStatus::{Available, Occupied};

        let athens = AreaConfig {
            key: "Athens".into(),
            center: MapCenter { lat: 37.9755, lng: 23.7348, zoom: 13 },
            spots: vec![
                SpotSeed::new("1", "Syntagma Square Parking",  37.9755, 23.7348, Available),
                SpotSeed::new("2", "Plaka Area Parking",       37.9721, 23.7279, Occupied),
                SpotSeed::new("3", "Monastiraki Parking",      37.9759, 23.7258, Available),
                SpotSeed::new("4", "National Garden Parking",  37.9741, 23.7372, Occupied),
                SpotSeed::new("5", "Acropolis Museum Parking", 37.9681, 23.7279, Available),
            ],
        };

        let larissa = AreaConfig {
            key: "Larissa".into(),
            center: MapCenter { lat: 39.6390, lng: 22.4194, zoom: 13 },
            spots: vec![
                SpotSeed::new("6",  "Central Square Parking",  39.6390, 22.4194, Available),
                SpotSeed::new("7",  "Railway Station Parking", 39.6367, 22.4198, Occupied),
                SpotSeed::new("8",  "University Parking",      39.6203, 22.4006, Available),
                SpotSeed::new("9",  "Shopping Center Parking", 39.6342, 22.4105, Occupied),
                SpotSeed::new("10", "Hospital Parking",        39.6298, 22.4234, Available),
            ],
        };

        Self::new(vec![larissa, athens])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_demo() {
        let c = SimConfig::default_test();
        assert_eq!(c.tick_interval_ms, 5_000);
        assert!((c.flip_probability - 0.10).abs() < f64::EPSILON);
        assert_eq!(c.default_area, "Athens");
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_config_json_fills_defaults() {
        let c: SimConfig = serde_json::from_str(r#"{ "flip_probability": 0.25 }"#).unwrap();
        assert_eq!(c.tick_interval_ms, DEFAULT_TICK_INTERVAL_MS);
        assert!((c.flip_probability - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let c = SimConfig { flip_probability: 1.5, ..SimConfig::default() };
        assert!(matches!(c.validate(), Err(SimError::InvalidConfig { .. })));

        let c = SimConfig { tick_interval_ms: 0, ..SimConfig::default() };
        assert!(matches!(c.validate(), Err(SimError::InvalidConfig { .. })));
    }

    #[test]
    fn missing_data_dir_reports_io_error() {
        let dir = "./no-such-smartpark-data-dir";
        assert!(matches!(SimConfig::load(dir), Err(SimError::Io(_))));
        assert!(matches!(AreaCatalog::load(dir), Err(SimError::Io(_))));
        assert_eq!(AreaCatalog::load_or_builtin(dir).unwrap(), AreaCatalog::builtin());
    }

    #[test]
    fn builtin_lists_areas_in_picker_order() {
        assert_eq!(AreaCatalog::builtin().area_keys(), vec!["Larissa", "Athens"]);
    }

    #[test]
    fn seed_without_coordinates_parses() {
        let json = r#"{ "areas": [ { "key": "X",
            "center": { "lat": 0.0, "lng": 0.0, "zoom": 10 },
            "spots": [ { "id": "a", "name": "A", "status": "available" } ] } ] }"#;
        let catalog = AreaCatalog::from_json(json).unwrap();
        let seed = &catalog.get("X").unwrap().spots[0];
        assert!(seed.position().is_none());
    }
}
