//! Simulation clock and periodic timers.
//!
//! Time is virtual: the clock only moves when the owner advances it.
//! Timer callbacks are delivered as `TimerFire` values that the owner
//! dispatches, one at a time, to whoever holds the token.

use crate::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Furthest the virtual clock may run past its epoch (1000 years).
pub const MAX_ELAPSED_MS: u64 = 1_000 * 365 * 24 * 60 * 60 * 1_000;

/// Handle for a scheduled periodic timer. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerToken(pub u64);

/// One due firing of a periodic timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFire {
    pub token: TimerToken,
    pub at:    Timestamp,
}

/// Clock and timer contract the map engine depends on.
pub trait TimerProvider {
    fn now(&self) -> Timestamp;

    /// Schedule a timer that fires every `interval_ms`, first firing
    /// one interval from now.
    fn schedule_periodic(&mut self, interval_ms: u64) -> TimerToken;

    /// Cancel a timer. Any firing not yet delivered is dropped.
    /// Cancelling an unknown or already-cancelled token is a no-op.
    fn cancel(&mut self, token: TimerToken);
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    pub epoch:      Timestamp,
    pub elapsed_ms: u64,
}

impl SimClock {
    pub fn new(epoch: Timestamp) -> Self {
        Self { epoch, elapsed_ms: 0 }
    }

    /// Epoch plus elapsed time. Saturates at `MAX_ELAPSED_MS` and at
    /// the largest representable timestamp.
    pub fn now(&self) -> Timestamp {
        let elapsed = chrono::Duration::milliseconds(self.elapsed_ms.min(MAX_ELAPSED_MS) as i64);
        self.epoch
            .checked_add_signed(elapsed)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC)
    }

    /// Move forward to `elapsed_ms`. Never moves backwards.
    pub fn advance_to(&mut self, elapsed_ms: u64) {
        self.elapsed_ms = self.elapsed_ms.max(elapsed_ms.min(MAX_ELAPSED_MS));
    }
}

#[derive(Debug, Clone)]
struct PeriodicTimer {
    interval_ms: u64,
    next_due_ms: u64,
}

/// Virtual-time timer provider. Used by the runner and by tests.
#[derive(Debug, Clone)]
pub struct ManualTimer {
    clock:      SimClock,
    timers:     BTreeMap<TimerToken, PeriodicTimer>,
    next_token: u64,
}

impl ManualTimer {
    pub fn new(epoch: Timestamp) -> Self {
        Self {
            clock:      SimClock::new(epoch),
            timers:     BTreeMap::new(),
            next_token: 1,
        }
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.clock.elapsed_ms
    }

    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    /// Pop the earliest firing due at or before `until_ms`, moving the
    /// clock to its due time. Ties fire in token order.
    pub fn next_fire(&mut self, until_ms: u64) -> Option<TimerFire> {
        let (token, due_ms) = self
            .timers
            .iter()
            .filter(|(_, t)| t.next_due_ms <= until_ms)
            .map(|(token, t)| (*token, t.next_due_ms))
            .min_by_key(|(token, due)| (*due, *token))?;

        if let Some(timer) = self.timers.get_mut(&token) {
            timer.next_due_ms = timer.next_due_ms.saturating_add(timer.interval_ms);
        }
        self.clock.advance_to(due_ms);
        Some(TimerFire { token, at: self.clock.now() })
    }

    /// Move the clock to `until_ms` without delivering anything.
    pub fn settle(&mut self, until_ms: u64) {
        self.clock.advance_to(until_ms);
    }
}

impl TimerProvider for ManualTimer {
    fn now(&self) -> Timestamp {
        self.clock.now()
    }

    fn schedule_periodic(&mut self, interval_ms: u64) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        // A zero interval would fire forever without time moving.
        let interval_ms = interval_ms.max(1);
        self.timers.insert(
            token,
            PeriodicTimer {
                interval_ms,
                next_due_ms: self.clock.elapsed_ms.saturating_add(interval_ms),
            },
        );
        token
    }

    fn cancel(&mut self, token: TimerToken) {
        self.timers.remove(&token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn timer() -> ManualTimer {
        ManualTimer::new(chrono::Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap())
    }

    #[test]
    fn periodic_timer_fires_every_interval() {
        let mut t = timer();
        let token = t.schedule_periodic(5_000);

        let fires: Vec<TimerFire> = std::iter::from_fn(|| t.next_fire(15_000)).collect();
        assert_eq!(fires.len(), 3);
        assert!(fires.iter().all(|f| f.token == token));
        assert_eq!(t.elapsed_ms(), 15_000);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut t = timer();
        let token = t.schedule_periodic(1_000);
        t.cancel(token);
        assert!(t.next_fire(10_000).is_none());
        assert_eq!(t.active_timers(), 0);
    }

    #[test]
    fn tokens_are_never_reused() {
        let mut t = timer();
        let a = t.schedule_periodic(1_000);
        t.cancel(a);
        let b = t.schedule_periodic(1_000);
        assert_ne!(a, b);
    }

    #[test]
    fn clock_saturates_instead_of_overflowing() {
        let epoch = chrono::Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let mut clock = SimClock::new(epoch);
        clock.advance_to(u64::MAX);
        assert_eq!(clock.elapsed_ms, MAX_ELAPSED_MS);

        let capped = epoch + chrono::Duration::milliseconds(MAX_ELAPSED_MS as i64);
        assert_eq!(clock.now(), capped);

        // Even a hand-built clock past the cap reports a valid time.
        let clock = SimClock { epoch, elapsed_ms: u64::MAX };
        assert_eq!(clock.now(), capped);
    }

    #[test]
    fn huge_interval_does_not_overflow_due_time() {
        let mut t = timer();
        t.schedule_periodic(u64::MAX);
        assert!(t.next_fire(MAX_ELAPSED_MS).is_none());
    }

    #[test]
    fn clock_never_moves_backwards() {
        let mut t = timer();
        t.settle(2_000);
        t.settle(1_000);
        assert_eq!(t.elapsed_ms(), 2_000);
    }
}
