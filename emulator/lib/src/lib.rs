// Licensed under the Apache-2.0 license

//! Emulation Worker Library
//!
//! Runs the emulated device on a dedicated background thread, paced against
//! wall-clock time, while the control thread (usually the one driving video
//! and input) issues resume/stop commands and collects the results.
//!
//! The control thread owns an [`EmulationWorker`] and calls
//! [`EmulationWorker::start`] at the beginning of a frame and
//! [`EmulationWorker::stop`] at its end. Faults raised by the device on the
//! worker thread are handed back by `stop()`.

pub mod budget;
pub mod channel;
pub mod clock;
pub mod dispatch;
pub mod error;
pub mod state;
pub mod worker;

// Re-export the main types for convenience
pub use budget::CycleBudget;
pub use channel::{SignalChannel, WakeupChannel};
pub use clock::VirtualClock;
pub use dispatch::{Device, DispatchResult, DispatchStatus, SharedDevice, SharedDispatchResult};
pub use error::{DispatchFault, WorkerError, WorkerPanic};
pub use state::{AtomicState, Signal, State};
pub use worker::EmulationWorker;
