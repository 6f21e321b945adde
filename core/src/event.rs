//! Engine events: everything observers can learn about a view.
//!
//! RULE: Every state change the engine makes is reported as an event
//! and appended to the in-memory event log, in order.

use crate::{
    spot::SpotStatus,
    types::{AreaKey, Generation, SpotId, Tick, Timestamp},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Area lifecycle ─────────────────────────────
    AreaLoaded {
        area:       AreaKey,
        generation: Generation,
        spot_count: usize,
        at:         Timestamp,
    },
    AreaLoadRejected {
        area:   AreaKey,
        reason: String,
    },
    ViewTornDown {
        removed_markers: usize,
    },

    // ── Simulation ─────────────────────────────────
    SpotStatusChanged {
        tick:    Tick,
        spot_id: SpotId,
        from:    SpotStatus,
        to:      SpotStatus,
        at:      Timestamp,
    },
    TickCompleted {
        tick:      Tick,
        changed:   usize,
        available: usize,
        occupied:  usize,
        total:     usize,
    },
    TickDiscarded {
        tick:   Tick,
        reason: DiscardReason,
    },
    SimulationPaused {
        tick: Tick,
    },
    SimulationResumed {
        tick: Tick,
    },

    // ── Rendering ──────────────────────────────────
    MarkersReconciled {
        tick:    Tick,
        added:   usize,
        updated: usize,
        removed: usize,
    },
}

impl SimEvent {
    /// Stable string name, used for the event_type column of the log.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::AreaLoaded { .. }        => "area_loaded",
            Self::AreaLoadRejected { .. }  => "area_load_rejected",
            Self::ViewTornDown { .. }      => "view_torn_down",
            Self::SpotStatusChanged { .. } => "spot_status_changed",
            Self::TickCompleted { .. }     => "tick_completed",
            Self::TickDiscarded { .. }     => "tick_discarded",
            Self::SimulationPaused { .. }  => "simulation_paused",
            Self::SimulationResumed { .. } => "simulation_resumed",
            Self::MarkersReconciled { .. } => "markers_reconciled",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// The firing came from a timer that has since been cancelled.
    StaleTimer,
    /// The area changed between computing and applying the tick.
    AreaChanged,
}

/// One entry of the in-memory event log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventLogEntry {
    pub seq:        u64,
    pub tick:       Tick,
    pub event_type: String,
    pub payload:    String, // JSON-serialized SimEvent
}
