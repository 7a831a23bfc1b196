/*++

Licensed under the Apache-2.0 license.

File Name:

    clock.rs

Abstract:

    Virtual time used to turn elapsed wall-clock time into a cycle budget.

--*/

use std::time::Instant;

use crate::budget::CycleBudget;

/// Anchor of emulated time.
///
/// The anchor marks the wall-clock instant up to which emulation has been
/// accounted for. Each step moves it by exactly the time its cycles stand
/// for, so rounding in one step does not accumulate over a run.
#[derive(Debug, Clone, Copy)]
pub struct VirtualClock {
    anchor: Instant,
}

impl VirtualClock {
    pub fn new(now: Instant) -> Self {
        Self { anchor: now }
    }

    pub fn reset(&mut self, now: Instant) {
        self.anchor = now;
    }

    pub fn now(&self) -> Instant {
        self.anchor
    }

    /// Instant at which emulated time catches up with wall time again.
    pub fn deadline(&self) -> Instant {
        self.anchor
    }

    /// Cycles owed for the wall time elapsed since the anchor, clamped to the
    /// budget bounds.
    pub fn budget(&self, now: Instant, budget: &CycleBudget) -> u64 {
        let elapsed = now.saturating_duration_since(self.anchor);
        budget.clamp(budget.cycles_in(elapsed))
    }

    /// Account for `cycles` emulated cycles.
    ///
    /// Lag beyond one maximum timeslice is dropped: after a long stall of the
    /// host the device is not made to race through the backlog.
    pub fn advance(&mut self, cycles: u64, budget: &CycleBudget, now: Instant) {
        self.anchor += budget.duration_of(cycles);

        let max_lag = budget.max_timeslice();
        if now.saturating_duration_since(self.anchor) > max_lag {
            self.anchor = now.checked_sub(max_lag).unwrap_or(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn budget() -> CycleBudget {
        CycleBudget::new(1_000, 10, 100).unwrap()
    }

    #[test]
    fn test_budget_follows_elapsed_time() {
        let start = Instant::now();
        let clock = VirtualClock::new(start);
        let budget = budget();

        // Nothing elapsed yet: the minimum keeps the device moving.
        assert_eq!(clock.budget(start, &budget), 10);
        assert_eq!(clock.budget(start + Duration::from_millis(50), &budget), 50);
        // A long pause never hands out more than the maximum.
        assert_eq!(clock.budget(start + Duration::from_secs(5), &budget), 100);
    }

    #[test]
    fn test_now_before_anchor_is_treated_as_no_time() {
        let start = Instant::now();
        let mut clock = VirtualClock::new(start);
        let budget = budget();
        clock.advance(50, &budget, start);
        assert!(clock.deadline() > start);
        assert_eq!(clock.budget(start, &budget), 10);
    }

    #[test]
    fn test_advance_does_not_accumulate_rounding() {
        let start = Instant::now();
        let mut clock = VirtualClock::new(start);
        let budget = CycleBudget::new(3, 1, 3).unwrap();

        // One cycle at 3 Hz is 333_333_333ns; three steps add up to 999_999_999ns
        // and the anchor is exact to the nanosecond of what was accounted.
        for _ in 0..3 {
            clock.advance(1, &budget, start);
        }
        assert_eq!(clock.now() - start, Duration::from_nanos(999_999_999));
    }

    #[test]
    fn test_advance_drops_backlog_beyond_one_timeslice() {
        let start = Instant::now();
        let mut clock = VirtualClock::new(start);
        let budget = budget();

        let now = start + Duration::from_secs(10);
        clock.advance(100, &budget, now);
        // At most one maximum timeslice (100 cycles = 100ms) of lag remains.
        assert_eq!(now - clock.now(), Duration::from_millis(100));
        assert_eq!(clock.budget(now, &budget), 100);

        clock.advance(100, &budget, now);
        assert_eq!(clock.now(), now);
        assert_eq!(clock.budget(now, &budget), 10);
    }

    #[test]
    fn test_reset() {
        let start = Instant::now();
        let mut clock = VirtualClock::new(start);
        let later = start + Duration::from_millis(10);
        clock.reset(later);
        assert_eq!(clock.now(), later);
        assert_eq!(clock.deadline(), later);
    }
}
