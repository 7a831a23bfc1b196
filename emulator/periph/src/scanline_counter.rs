/*++

Licensed under the Apache-2.0 license.

File Name:

    scanline_counter.rs

Abstract:

    File contains a device that only counts cycles, scanlines and frames.
    Used to exercise the emulation worker without a full console core.

--*/

use emulator_consts::{CYCLES_PER_SCANLINE, NTSC_SCANLINES};
use emulator_worker::{Device, DispatchResult};
use log::trace;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CounterFault {
    #[error("injected fault on dispatch {dispatch} at cycle {cycle}")]
    Injected { dispatch: u64, cycle: u64 },
}

#[derive(Debug)]
pub struct ScanlineCounter {
    scanlines_per_frame: u32,
    cycles: u64,
    dispatches: u64,
    fault_after: Option<u64>,
    breakpoint: Option<u64>,
    breakpoint_hit: bool,
}

impl Default for ScanlineCounter {
    fn default() -> Self {
        Self {
            scanlines_per_frame: NTSC_SCANLINES,
            cycles: 0,
            dispatches: 0,
            fault_after: None,
            breakpoint: None,
            breakpoint_hit: false,
        }
    }
}

impl ScanlineCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines per frame of the emulated video standard. Zero is ignored.
    pub fn scanlines_per_frame(mut self, lines: u32) -> Self {
        if lines != 0 {
            self.scanlines_per_frame = lines;
        }
        self
    }

    /// Fail the `n`th dispatch (1-based) with [`CounterFault::Injected`].
    pub fn fault_after(mut self, n: Option<u64>) -> Self {
        self.fault_after = n;
        self
    }

    /// Halt with a debugger status once the cycle counter reaches `cycle`.
    /// The breakpoint fires once.
    pub fn breakpoint(mut self, cycle: Option<u64>) -> Self {
        self.breakpoint = cycle;
        self
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn dispatches(&self) -> u64 {
        self.dispatches
    }

    pub fn frames(&self) -> u64 {
        self.lines() / self.scanlines_per_frame as u64
    }

    /// Scanline the beam is on within the current frame.
    pub fn scanline(&self) -> u16 {
        (self.lines() % self.scanlines_per_frame as u64) as u16
    }

    fn lines(&self) -> u64 {
        self.cycles / CYCLES_PER_SCANLINE as u64
    }
}

impl Device for ScanlineCounter {
    fn dispatch(&mut self, budget: u64, result: &mut DispatchResult) -> anyhow::Result<()> {
        self.dispatches += 1;
        if self.fault_after == Some(self.dispatches) {
            return Err(CounterFault::Injected {
                dispatch: self.dispatches,
                cycle: self.cycles,
            }
            .into());
        }

        if let Some(cycle) = self.breakpoint {
            if !self.breakpoint_hit && self.cycles + budget >= cycle {
                let consumed = cycle.saturating_sub(self.cycles);
                self.cycles += consumed;
                self.breakpoint_hit = true;
                result.set_debugger(
                    consumed,
                    format!("breakpoint at cycle {}", cycle),
                    Some(self.scanline()),
                    false,
                );
                return Ok(());
            }
        }

        self.cycles += budget;
        trace!(
            "scanline counter: +{} cycles, frame {} line {}",
            budget,
            self.frames(),
            self.scanline()
        );
        result.set_ok(budget);
        Ok(())
    }
}
