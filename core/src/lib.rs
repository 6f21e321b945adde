//! SmartPark live-status engine: simulated parking occupancy for an
//! area, and id-keyed reconciliation of the map markers that show it.

pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod reconciler;
pub mod render;
pub mod rng;
pub mod snapshot;
pub mod spot;
pub mod spot_store;
pub mod types;
