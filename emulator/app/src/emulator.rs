/*++

Licensed under the Apache-2.0 license.

File Name:

    emulator.rs

Abstract:

    File contains the frame-paced front-end that drives the emulation worker.

--*/

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use emulator_consts::{
    DEFAULT_MAX_CYCLES, DEFAULT_MIN_CYCLES, NTSC_CYCLES_PER_SECOND, NTSC_FRAME_RATE,
    NTSC_SCANLINES, PAL_CYCLES_PER_FRAME, PAL_CYCLES_PER_SECOND, PAL_FRAME_RATE, PAL_SCANLINES,
};
use emulator_periph::ScanlineCounter;
use emulator_worker::{
    CycleBudget, DispatchResult, DispatchStatus, EmulationWorker, SharedDispatchResult,
    WorkerError,
};
use log::{debug, info, warn, LevelFilter};

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, name = "Emulation Worker Demo")]
pub struct EmulatorArgs {
    /// Emulate a PAL console (312 lines at 50Hz) instead of NTSC.
    #[arg(long)]
    pub pal: bool,

    /// Emulated CPU clock rate. Defaults to the rate of the video standard.
    #[arg(long, env = "EMULATOR_CYCLES_PER_SECOND")]
    pub cycles_per_second: Option<u32>,

    /// Smallest number of cycles handed to the device per step.
    #[arg(long, env = "EMULATOR_MIN_CYCLES", default_value_t = DEFAULT_MIN_CYCLES)]
    pub min_cycles: u32,

    /// Largest number of cycles handed to the device per step. Defaults to
    /// one frame of the video standard.
    #[arg(long, env = "EMULATOR_MAX_CYCLES")]
    pub max_cycles: Option<u32>,

    /// Stop after this many frames. Runs until Ctrl-C otherwise.
    #[arg(long)]
    pub frames: Option<u64>,

    /// Host frames per second; the worker is started and stopped once per
    /// frame. Defaults to the field rate of the video standard.
    #[arg(long)]
    pub frame_rate: Option<u32>,

    /// Make the device fail its Nth step.
    #[arg(long)]
    pub fault_after: Option<u64>,

    /// Halt the device once its cycle counter reaches this value.
    #[arg(long)]
    pub breakpoint: Option<u64>,

    #[arg(long, env = "EMULATOR_LOG_LEVEL", default_value = "info", value_parser = parse_level)]
    pub log_level: LevelFilter,
}

impl Default for EmulatorArgs {
    fn default() -> Self {
        Self {
            pal: false,
            cycles_per_second: None,
            min_cycles: DEFAULT_MIN_CYCLES,
            max_cycles: None,
            frames: None,
            frame_rate: None,
            fault_after: None,
            breakpoint: None,
            log_level: LevelFilter::Info,
        }
    }
}

impl EmulatorArgs {
    pub fn cycles_per_second(&self) -> u32 {
        self.cycles_per_second.unwrap_or(if self.pal {
            PAL_CYCLES_PER_SECOND
        } else {
            NTSC_CYCLES_PER_SECOND
        })
    }

    pub fn max_cycles(&self) -> u32 {
        self.max_cycles.unwrap_or(if self.pal {
            PAL_CYCLES_PER_FRAME
        } else {
            DEFAULT_MAX_CYCLES
        })
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate.unwrap_or(if self.pal {
            PAL_FRAME_RATE
        } else {
            NTSC_FRAME_RATE
        })
    }

    pub fn scanlines_per_frame(&self) -> u32 {
        if self.pal {
            PAL_SCANLINES
        } else {
            NTSC_SCANLINES
        }
    }
}

fn parse_level(level: &str) -> Result<LevelFilter, String> {
    level
        .parse()
        .map_err(|_| format!("unknown log level '{}'", level))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStepAction {
    Continue,
    Break,
    Exit,
}

pub struct Emulator {
    worker: EmulationWorker,
    device: Arc<Mutex<ScanlineCounter>>,
    result: SharedDispatchResult,
    budget: CycleBudget,
    frame_time: Duration,
    frames: u64,
    total_cycles: u64,
}

impl Emulator {
    pub fn from_args(args: &EmulatorArgs) -> anyhow::Result<Self> {
        let budget =
            CycleBudget::new(args.cycles_per_second(), args.min_cycles, args.max_cycles())
                .context("invalid pacing parameters")?;
        let frame_rate = args.frame_rate();
        if frame_rate == 0 {
            bail!("frame rate must be non-zero");
        }

        let device = ScanlineCounter::new()
            .scanlines_per_frame(args.scanlines_per_frame())
            .fault_after(args.fault_after)
            .breakpoint(args.breakpoint);

        info!(
            "Emulating {} cycles/s in steps of {}..={} cycles, {} frames/s",
            budget.cycles_per_second(),
            budget.min_cycles(),
            budget.max_cycles(),
            frame_rate
        );

        Ok(Self {
            worker: EmulationWorker::new(),
            device: Arc::new(Mutex::new(device)),
            result: Arc::new(Mutex::new(DispatchResult::new())),
            budget,
            frame_time: Duration::from_secs(1) / frame_rate,
            frames: 0,
            total_cycles: 0,
        })
    }

    /// Let the worker run for one host frame and report how the device fared.
    pub fn run_frame(&mut self) -> Result<SystemStepAction, WorkerError> {
        self.worker
            .start_with_budget(self.budget, self.result.clone(), self.device.clone())?;
        thread::sleep(self.frame_time);
        let cycles = self.worker.stop()?;

        self.frames += 1;
        self.total_cycles += cycles;
        debug!("Frame {}: {} cycles", self.frames, cycles);

        let result = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(match result.status() {
            DispatchStatus::Ok => SystemStepAction::Continue,
            DispatchStatus::Debugger => {
                info!(
                    "Device halted: {} (scanline {:?})",
                    result.message().unwrap_or("debugger"),
                    result.address()
                );
                SystemStepAction::Break
            }
            status => {
                warn!(
                    "Device stopped with {}: {}",
                    status,
                    result.message().unwrap_or("no details")
                );
                SystemStepAction::Exit
            }
        })
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Cycles emulated over all frames so far.
    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Cycles counted by the device itself.
    pub fn device_cycles(&self) -> u64 {
        self.device
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cycles()
    }
}
