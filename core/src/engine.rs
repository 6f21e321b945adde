//! The map engine: one live area view.
//!
//! LIFECYCLE:
//!   1. mount:        load the default area, render it, start the timer.
//!   2. select_area:  load the new area first; only on success cancel the
//!                    old timer, reconcile to the new set, start a new timer.
//!   3. timer firing: compute a tick, apply it, reconcile, notify.
//!   4. teardown:     cancel the timer, remove every marker.
//!
//! RULES:
//!   - One timer per view. A firing from any other token is stale and
//!     is discarded.
//!   - Ticks never overlap: a tick is fully applied and its events
//!     returned before the next firing is dispatched.
//!   - A tick computed against one area generation is never applied to
//!     another. It is discarded, not merged.
//!   - All randomness flows through the engine's SimRng, reseeded per
//!     area load from (seed, generation).

use crate::{
    clock::{ManualTimer, TimerProvider, TimerToken, MAX_ELAPSED_MS},
    command::ViewCommand,
    config::{AreaCatalog, SimConfig},
    error::{SimError, SimResult},
    event::{DiscardReason, EventLogEntry, SimEvent},
    reconciler::{MarkerReconciler, ReconcileStats},
    rng::SimRng,
    snapshot::ViewSnapshot,
    spot::{OccupancySummary, ParkingSpot},
    spot_store::{self, SpotStore},
    types::{Generation, Tick, Timestamp},
};

/// A tick computed but not yet applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTick {
    pub generation: Generation,
    pub tick:       Tick,
    pub at:         Timestamp,
    pub spots:      Vec<ParkingSpot>,
}

pub struct MapEngine<S, T> {
    config:       SimConfig,
    store:        SpotStore,
    reconciler:   MarkerReconciler,
    surface:      S,
    timer:        T,
    seed:         u64,
    rng:          SimRng,
    active_timer: Option<TimerToken>,
    current_tick: Tick,
    paused:       bool,
    log:          Vec<EventLogEntry>,
}

impl<S, T> MapEngine<S, T>
where
    S: crate::render::RenderSurface,
    T: TimerProvider,
{
    /// Mount a view on `surface` showing `config.default_area`.
    pub fn mount(
        config: SimConfig,
        catalog: AreaCatalog,
        surface: S,
        timer: T,
        seed: u64,
    ) -> SimResult<Self> {
        config.validate()?;
        let default_area = config.default_area.clone();
        let mut engine = Self {
            config,
            store:        SpotStore::new(catalog),
            reconciler:   MarkerReconciler::new(),
            surface,
            timer,
            seed,
            rng:          SimRng::for_generation(seed, 0),
            active_timer: None,
            current_tick: 0,
            paused:       false,
            log:          Vec::new(),
        };
        engine.select_area(&default_area)?;
        Ok(engine)
    }

    /// Swap the view to another area.
    ///
    /// On error nothing changes: current markers stay drawn and the
    /// current timer keeps running. Surfacing the message is up to the caller.
    pub fn select_area(&mut self, area_key: &str) -> SimResult<Vec<SimEvent>> {
        let now = self.timer.now();
        let spots = match self.store.load_area(area_key, now) {
            Ok(spots) => spots,
            Err(e) => {
                log::warn!("tick={} engine: area '{area_key}' rejected: {e}", self.current_tick);
                self.record(&SimEvent::AreaLoadRejected {
                    area:   area_key.to_string(),
                    reason: e.to_string(),
                })?;
                return Err(e);
            }
        };

        // The old timer must be gone before the new one starts, so no
        // firing scheduled for the old area can land on the new one.
        self.stop_timer();

        let generation = self.store.generation();
        self.rng = SimRng::for_generation(self.seed, generation);

        let ops = self.reconciler.reconcile(&spots, &mut self.surface);
        let stats = ReconcileStats::of(&ops);

        let events = vec![
            SimEvent::AreaLoaded {
                area: area_key.to_string(),
                generation,
                spot_count: spots.len(),
                at: now,
            },
            SimEvent::MarkersReconciled {
                tick:    self.current_tick,
                added:   stats.added,
                updated: stats.updated,
                removed: stats.removed,
            },
        ];
        self.record_all(&events)?;

        if !self.paused {
            self.start_timer();
        }
        Ok(events)
    }

    /// Dispatch a timer firing.
    pub fn handle_timer(&mut self, token: TimerToken) -> SimResult<Vec<SimEvent>> {
        if self.active_timer != Some(token) {
            log::debug!(
                "tick={} engine: discarding firing from stale timer {:?}",
                self.current_tick,
                token
            );
            let event = SimEvent::TickDiscarded {
                tick:   self.current_tick,
                reason: DiscardReason::StaleTimer,
            };
            self.record(&event)?;
            return Ok(vec![event]);
        }

        match self.begin_tick() {
            Some(pending) => self.apply_tick(pending),
            None => Ok(vec![]),
        }
    }

    /// Compute the next tick against the active spot set without applying it.
    /// Returns None when no area is loaded.
    pub fn begin_tick(&mut self) -> Option<PendingTick> {
        let active = self.store.active()?;
        let at = self.timer.now();
        let spots = spot_store::tick(
            &active.spots,
            &mut self.rng,
            self.config.flip_probability,
            at,
        );
        Some(PendingTick {
            generation: active.generation,
            tick: self.current_tick + 1,
            at,
            spots,
        })
    }

    /// Apply a computed tick, reconcile markers and report what changed.
    /// A tick from an older generation is discarded.
    pub fn apply_tick(&mut self, pending: PendingTick) -> SimResult<Vec<SimEvent>> {
        let previous = match self.store.active() {
            Some(active) if active.generation == pending.generation => active.spots.clone(),
            _ => {
                log::debug!(
                    "tick={} engine: discarding tick from generation {}",
                    pending.tick,
                    pending.generation
                );
                let event = SimEvent::TickDiscarded {
                    tick:   pending.tick,
                    reason: DiscardReason::AreaChanged,
                };
                self.record(&event)?;
                return Ok(vec![event]);
            }
        };

        let tick = pending.tick;
        let mut events: Vec<SimEvent> = previous
            .iter()
            .zip(&pending.spots)
            .filter(|(before, after)| before.status != after.status)
            .map(|(before, after)| SimEvent::SpotStatusChanged {
                tick,
                spot_id: after.id.clone(),
                from:    before.status,
                to:      after.status,
                at:      after.last_updated,
            })
            .collect();
        let changed = events.len();

        let ops = self.reconciler.reconcile(&pending.spots, &mut self.surface);
        let stats = ReconcileStats::of(&ops);
        let applied = self.store.replace_spots(pending.generation, pending.spots);
        debug_assert!(applied, "tick {tick} passed the generation check but was rejected");
        self.current_tick = tick;

        let summary = self.store.summary();
        log::debug!(
            "tick={tick} engine: {changed} changed, available={} occupied={} total={}",
            summary.available,
            summary.occupied,
            summary.total
        );

        events.push(SimEvent::MarkersReconciled {
            tick,
            added:   stats.added,
            updated: stats.updated,
            removed: stats.removed,
        });
        events.push(SimEvent::TickCompleted {
            tick,
            changed,
            available: summary.available,
            occupied:  summary.occupied,
            total:     summary.total,
        });
        self.record_all(&events)?;
        Ok(events)
    }

    /// Stop ticking. Markers stay as they are.
    pub fn pause(&mut self) -> SimResult<Vec<SimEvent>> {
        if self.paused {
            return Ok(vec![]);
        }
        self.paused = true;
        self.stop_timer();
        let event = SimEvent::SimulationPaused { tick: self.current_tick };
        self.record(&event)?;
        Ok(vec![event])
    }

    pub fn resume(&mut self) -> SimResult<Vec<SimEvent>> {
        if !self.paused {
            return Ok(vec![]);
        }
        self.paused = false;
        if self.store.active().is_some() {
            self.start_timer();
        }
        let event = SimEvent::SimulationResumed { tick: self.current_tick };
        self.record(&event)?;
        Ok(vec![event])
    }

    pub fn execute(&mut self, command: &ViewCommand) -> SimResult<Vec<SimEvent>> {
        match command {
            ViewCommand::SelectArea { area } => self.select_area(area),
            ViewCommand::Pause => self.pause(),
            ViewCommand::Resume => self.resume(),
        }
    }

    /// Unmount the view: stop the timer and remove every marker.
    /// Returns the surface and timer provider.
    pub fn teardown(mut self) -> (S, T) {
        self.stop_timer();
        let removed = self.reconciler.teardown(&mut self.surface);
        self.store.clear();
        log::info!(
            "tick={} engine: view torn down, removed {removed} markers",
            self.current_tick
        );
        (self.surface, self.timer)
    }

    // ── Queries ────────────────────────────────────────────────

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn active_area(&self) -> Option<&str> {
        self.store.active().map(|a| a.key.as_str())
    }

    pub fn spots(&self) -> &[ParkingSpot] {
        self.store.active().map(|a| a.spots.as_slice()).unwrap_or(&[])
    }

    pub fn summary(&self) -> OccupancySummary {
        self.store.summary()
    }

    pub fn active_timer(&self) -> Option<TimerToken> {
        self.active_timer
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn reconciler(&self) -> &MarkerReconciler {
        &self.reconciler
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn events(&self) -> &[EventLogEntry] {
        &self.log
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let active = self.store.active();
        let catalog = self.store.catalog();
        ViewSnapshot {
            area:       active.map(|a| a.key.clone()),
            generation: active.map(|a| a.generation).unwrap_or(0),
            center:     active.and_then(|a| catalog.get(&a.key)).map(|c| c.center),
            tick:       self.current_tick,
            now:        self.timer.now(),
            paused:     self.paused,
            summary:    self.store.summary(),
            spots:      self.spots().to_vec(),
            areas:      catalog.area_keys().into_iter().map(String::from).collect(),
        }
    }

    // ── Internals ──────────────────────────────────────────────

    fn start_timer(&mut self) {
        let token = self.timer.schedule_periodic(self.config.tick_interval_ms);
        self.active_timer = Some(token);
    }

    fn stop_timer(&mut self) {
        if let Some(token) = self.active_timer.take() {
            self.timer.cancel(token);
        }
    }

    fn record(&mut self, event: &SimEvent) -> SimResult<()> {
        let entry = EventLogEntry {
            seq:        self.log.len() as u64,
            tick:       self.current_tick,
            event_type: event.type_name().to_string(),
            payload:    serde_json::to_string(event)?,
        };
        self.log.push(entry);
        Ok(())
    }

    fn record_all(&mut self, events: &[SimEvent]) -> SimResult<()> {
        for event in events {
            self.record(event)?;
        }
        Ok(())
    }
}

impl<S> MapEngine<S, ManualTimer>
where
    S: crate::render::RenderSurface,
{
    /// Advance virtual time by `ms`, dispatching every firing that falls due.
    /// Firings are delivered one at a time, so a handler that cancels a
    /// timer also drops that timer's remaining firings.
    /// Fails without moving the clock if the target lies past `MAX_ELAPSED_MS`.
    pub fn advance(&mut self, ms: u64) -> SimResult<Vec<SimEvent>> {
        let elapsed = self.timer.elapsed_ms();
        let until = elapsed
            .checked_add(ms)
            .filter(|until| *until <= MAX_ELAPSED_MS)
            .ok_or_else(|| SimError::TimeOutOfRange {
                reason: format!("cannot advance {ms} ms from {elapsed} ms elapsed"),
            })?;
        let mut events = Vec::new();
        while let Some(fire) = self.timer.next_fire(until) {
            events.extend(self.handle_timer(fire.token)?);
        }
        self.timer.settle(until);
        Ok(events)
    }

    /// Run `n` tick intervals of virtual time. Used for testing and the runner.
    pub fn run_ticks(&mut self, n: u64) -> SimResult<Vec<SimEvent>> {
        let interval = self.config.tick_interval_ms;
        let ms = n.checked_mul(interval).ok_or_else(|| SimError::TimeOutOfRange {
            reason: format!("{n} ticks of {interval} ms overflow the clock"),
        })?;
        self.advance(ms)
    }
}
