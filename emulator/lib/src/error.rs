/*++

Licensed under the Apache-2.0 license.

File Name:

    error.rs

Abstract:

    Errors reported by the emulation worker.

--*/

use std::any::Any;
use std::fmt;
use thiserror::Error;

/// Errors that the [`EmulationWorker`](crate::EmulationWorker) can return.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The pacing parameters are unusable.
    #[error("invalid cycle budget: {reason}")]
    InvalidBudget { reason: String },

    /// `start()` was called while a run is still active.
    #[error("emulation is already running")]
    AlreadyRunning,

    /// `stop()` was called without a matching `start()`.
    #[error("emulation has not been started")]
    NotStarted,

    /// The device faulted on the worker thread.
    #[error(transparent)]
    Dispatch(#[from] DispatchFault),

    /// The worker thread could not be created.
    #[error("failed to spawn emulation worker thread: {0}")]
    Bootstrap(#[source] std::io::Error),
}

impl WorkerError {
    pub fn invalid_budget(reason: impl Into<String>) -> Self {
        WorkerError::InvalidBudget {
            reason: reason.into(),
        }
    }
}

/// A fault captured on the worker thread and handed back by `stop()`.
///
/// The original error is kept as is; use [`DispatchFault::downcast_ref`] to
/// recover its concrete type.
#[derive(Error, Debug)]
#[error("emulation fault after {cycles_before_fault} cycles: {source}")]
pub struct DispatchFault {
    cycles_before_fault: u64,
    #[source]
    source: anyhow::Error,
}

impl DispatchFault {
    pub fn new(source: anyhow::Error, cycles_before_fault: u64) -> Self {
        Self {
            cycles_before_fault,
            source,
        }
    }

    /// Cycles emulated in this run before the faulting step.
    pub fn cycles_before_fault(&self) -> u64 {
        self.cycles_before_fault
    }

    pub fn error(&self) -> &anyhow::Error {
        &self.source
    }

    pub fn into_error(self) -> anyhow::Error {
        self.source
    }

    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.source.downcast_ref::<E>()
    }
}

/// A panic raised by the device while it was stepping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("device panicked: {message}")]
pub struct WorkerPanic {
    pub message: String,
}

impl WorkerPanic {
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "(unknown)".to_string()
        };
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Error, Debug, PartialEq)]
    #[error("illegal opcode {0:#04x}")]
    struct IllegalOpcode(u8);

    #[test]
    fn test_dispatch_fault_preserves_type() {
        let fault = DispatchFault::new(IllegalOpcode(0x02).into(), 1234);
        assert_eq!(fault.cycles_before_fault(), 1234);
        assert_eq!(fault.downcast_ref::<IllegalOpcode>(), Some(&IllegalOpcode(0x02)));
        assert_eq!(
            fault.to_string(),
            "emulation fault after 1234 cycles: illegal opcode 0x02"
        );

        let err: WorkerError = fault.into();
        match err {
            WorkerError::Dispatch(fault) => {
                assert!(fault.into_error().is::<IllegalOpcode>());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_panic_payloads() {
        let from_str = WorkerPanic::from_payload(Box::new("boom"));
        assert_eq!(from_str.message, "boom");

        let from_string = WorkerPanic::from_payload(Box::new(String::from("bang")));
        assert_eq!(from_string.message, "bang");

        let unknown = WorkerPanic::from_payload(Box::new(42u32));
        assert_eq!(unknown.to_string(), "device panicked: (unknown)");
    }
}
