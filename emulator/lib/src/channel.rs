/*++

Licensed under the Apache-2.0 license.

File Name:

    channel.rs

Abstract:

    Rendezvous channels between the control thread and the emulation worker.

--*/

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::state::{AtomicState, Signal, State};

/// Single-slot command channel from the control thread to the worker.
///
/// A sender blocks until the slot is free, and then until the worker has
/// taken its signal. Signals are therefore never queued, merged or lost.
#[derive(Debug)]
pub struct SignalChannel {
    pending: Mutex<Signal>,
    changed: Condvar,
}

impl Default for SignalChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalChannel {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Signal::None),
            changed: Condvar::new(),
        }
    }

    /// Deliver `signal` and wait until the worker has consumed it.
    pub fn send(&self, signal: Signal) {
        if signal == Signal::None {
            return;
        }

        let mut pending = self
            .changed
            .wait_while(self.lock(), |pending| *pending != Signal::None)
            .unwrap_or_else(PoisonError::into_inner);
        *pending = signal;
        self.changed.notify_all();

        let _pending = self
            .changed
            .wait_while(pending, |pending| *pending != Signal::None)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Block until a signal arrives and take it.
    pub fn wait(&self) -> Signal {
        let mut pending = self
            .changed
            .wait_while(self.lock(), |pending| *pending == Signal::None)
            .unwrap_or_else(PoisonError::into_inner);
        self.take(&mut pending)
    }

    /// Block until a signal arrives or `deadline` passes. Returns
    /// [`Signal::None`] on timeout.
    pub fn wait_until(&self, deadline: Instant) -> Signal {
        let timeout = deadline.saturating_duration_since(Instant::now());
        let (mut pending, _) = self
            .changed
            .wait_timeout_while(self.lock(), timeout, |pending| *pending == Signal::None)
            .unwrap_or_else(PoisonError::into_inner);
        self.take(&mut pending)
    }

    /// Take a pending signal without blocking.
    pub fn poll(&self) -> Signal {
        let mut pending = self.lock();
        self.take(&mut pending)
    }

    fn take(&self, pending: &mut MutexGuard<'_, Signal>) -> Signal {
        let signal = std::mem::replace(&mut **pending, Signal::None);
        if signal != Signal::None {
            // Senders wait for the slot to empty.
            self.changed.notify_all();
        }
        signal
    }

    fn lock(&self) -> MutexGuard<'_, Signal> {
        // The slot is a plain enum; a poisoned lock cannot leave it torn.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Readiness notifications from the worker to the control thread.
///
/// State changes are published while holding the wakeup lock, so a waiter
/// that checked the state under the same lock cannot miss the notification.
#[derive(Debug, Default)]
pub struct WakeupChannel {
    lock: Mutex<()>,
    changed: Condvar,
}

impl WakeupChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, state: &AtomicState, new_state: State) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        state.store(new_state);
        self.changed.notify_all();
    }

    /// Block until `ready` holds for the current state, and return that state.
    pub fn wait_for<F>(&self, state: &AtomicState, ready: F) -> State
    where
        F: Fn(State) -> bool,
    {
        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = self
            .changed
            .wait_while(guard, |_| !ready(state.load()))
            .unwrap_or_else(PoisonError::into_inner);
        state.load()
    }
}
