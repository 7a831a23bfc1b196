/*++

Licensed under the Apache-2.0 license.

File Name:

    dispatch.rs

Abstract:

    Interface between the emulation worker and the emulated device.

--*/

use std::sync::{Arc, Mutex};

use strum_macros::Display;

/// Outcome class of one device step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum DispatchStatus {
    /// The device has not reported anything yet.
    #[default]
    Invalid,
    /// The step completed normally.
    Ok,
    /// The step stopped early on a breakpoint or trap.
    Debugger,
    /// The device hit a condition it cannot continue from.
    Fatal,
}

/// What the device did during one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchResult {
    status: DispatchStatus,
    cycles: u64,
    message: Option<String>,
    address: Option<u16>,
    was_read_trap: bool,
}

impl DispatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> DispatchStatus {
        self.status
    }

    /// Cycles consumed by the step.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn address(&self) -> Option<u16> {
        self.address
    }

    pub fn was_read_trap(&self) -> bool {
        self.was_read_trap
    }

    pub fn is_success(&self) -> bool {
        self.status == DispatchStatus::Ok
    }

    pub fn set_ok(&mut self, cycles: u64) {
        *self = Self {
            status: DispatchStatus::Ok,
            cycles,
            ..Self::default()
        };
    }

    pub fn set_debugger(
        &mut self,
        cycles: u64,
        message: impl Into<String>,
        address: Option<u16>,
        was_read_trap: bool,
    ) {
        *self = Self {
            status: DispatchStatus::Debugger,
            cycles,
            message: Some(message.into()),
            address,
            was_read_trap,
        };
    }

    pub fn set_fatal(&mut self, cycles: u64, message: impl Into<String>) {
        *self = Self {
            status: DispatchStatus::Fatal,
            cycles,
            message: Some(message.into()),
            ..Self::default()
        };
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The emulated device, as seen by the worker.
pub trait Device: Send {
    /// Run one bounded burst of emulation of at most `budget` cycles and
    /// describe it in `result`.
    ///
    /// Returning an error (or panicking) faults the run; the error is handed
    /// back unchanged by `stop()`.
    fn dispatch(&mut self, budget: u64, result: &mut DispatchResult) -> anyhow::Result<()>;
}

impl<D: Device + ?Sized> Device for Box<D> {
    fn dispatch(&mut self, budget: u64, result: &mut DispatchResult) -> anyhow::Result<()> {
        (**self).dispatch(budget, result)
    }
}

/// Device handle shared between the caller and the worker.
pub type SharedDevice = Arc<Mutex<dyn Device>>;

/// Dispatch result shared between the caller and the worker.
pub type SharedDispatchResult = Arc<Mutex<DispatchResult>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_replace_previous_result() {
        let mut result = DispatchResult::new();
        assert_eq!(result.status(), DispatchStatus::Invalid);

        result.set_debugger(12, "breakpoint hit", Some(0xf000), true);
        assert_eq!(result.status(), DispatchStatus::Debugger);
        assert_eq!(result.cycles(), 12);
        assert_eq!(result.message(), Some("breakpoint hit"));
        assert_eq!(result.address(), Some(0xf000));
        assert!(result.was_read_trap());
        assert!(!result.is_success());

        result.set_ok(40);
        assert!(result.is_success());
        assert_eq!(result.cycles(), 40);
        assert_eq!(result.message(), None);
        assert_eq!(result.address(), None);
        assert!(!result.was_read_trap());

        result.set_fatal(3, "bus conflict");
        assert_eq!(result.status(), DispatchStatus::Fatal);
        assert_eq!(result.message(), Some("bus conflict"));

        result.reset();
        assert_eq!(result, DispatchResult::default());
    }

    #[test]
    fn test_boxed_device_dispatches() {
        struct Fixed;
        impl Device for Fixed {
            fn dispatch(&mut self, budget: u64, result: &mut DispatchResult) -> anyhow::Result<()> {
                result.set_ok(budget / 2);
                Ok(())
            }
        }

        let mut device: Box<dyn Device> = Box::new(Fixed);
        let mut result = DispatchResult::new();
        device.dispatch(10, &mut result).unwrap();
        assert_eq!(result.cycles(), 5);
    }
}
