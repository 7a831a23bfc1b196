/*++

Licensed under the Apache-2.0 license.

File Name:

    budget.rs

Abstract:

    Pacing parameters for one emulation run.

--*/

use std::time::Duration;

use emulator_consts::{DEFAULT_MAX_CYCLES, DEFAULT_MIN_CYCLES, NTSC_CYCLES_PER_SECOND};

use crate::error::WorkerError;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// How many cycles the device is offered per step, and how fast emulated
/// time runs against wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleBudget {
    cycles_per_second: u32,
    min_cycles: u32,
    max_cycles: u32,
}

impl CycleBudget {
    pub fn new(cycles_per_second: u32, min_cycles: u32, max_cycles: u32) -> Result<Self, WorkerError> {
        if cycles_per_second == 0 {
            return Err(WorkerError::invalid_budget("cycles per second must be non-zero"));
        }
        if min_cycles > max_cycles {
            return Err(WorkerError::invalid_budget(format!(
                "min cycles {} exceeds max cycles {}",
                min_cycles, max_cycles
            )));
        }
        Ok(Self {
            cycles_per_second,
            min_cycles,
            max_cycles,
        })
    }

    pub fn cycles_per_second(&self) -> u32 {
        self.cycles_per_second
    }

    pub fn min_cycles(&self) -> u32 {
        self.min_cycles
    }

    pub fn max_cycles(&self) -> u32 {
        self.max_cycles
    }

    pub fn clamp(&self, candidate: u64) -> u64 {
        candidate.clamp(self.min_cycles as u64, self.max_cycles as u64)
    }

    /// Wall time that `cycles` emulated cycles correspond to.
    pub fn duration_of(&self, cycles: u64) -> Duration {
        let nanos = cycles as u128 * NANOS_PER_SEC / self.cycles_per_second as u128;
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Whole cycles that fit into `duration` (truncating).
    pub fn cycles_in(&self, duration: Duration) -> u64 {
        let cycles = duration.as_nanos() * self.cycles_per_second as u128 / NANOS_PER_SEC;
        u64::try_from(cycles).unwrap_or(u64::MAX)
    }

    /// Longest wall time a single step may account for.
    pub fn max_timeslice(&self) -> Duration {
        self.duration_of(self.max_cycles as u64)
    }
}

impl Default for CycleBudget {
    fn default() -> Self {
        Self {
            cycles_per_second: NTSC_CYCLES_PER_SECOND,
            min_cycles: DEFAULT_MIN_CYCLES,
            max_cycles: DEFAULT_MAX_CYCLES,
        }
    }
}
