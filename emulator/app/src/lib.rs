// Licensed under the Apache-2.0 license

//! Emulation worker demo front-end
//!
//! Drives a cycle-counting device through the emulation worker, starting and
//! stopping it once per host frame.

use std::sync::atomic::AtomicBool;

pub mod emulator;

/// Cleared by the Ctrl-C handler to end the frame loop.
pub static EMULATOR_RUNNING: AtomicBool = AtomicBool::new(true);

pub use emulator::{Emulator, EmulatorArgs, SystemStepAction};

pub use emulator_worker::{EmulationWorker, State, WorkerError};
