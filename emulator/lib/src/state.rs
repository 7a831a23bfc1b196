/*++

Licensed under the Apache-2.0 license.

File Name:

    state.rs

Abstract:

    Worker phases and the commands the control thread sends to the worker.

--*/

use std::sync::atomic::{AtomicU8, Ordering};
use strum_macros::{Display, EnumIter, FromRepr};

/// Phase of the emulation worker.
///
/// Written only by the worker thread (apart from the initial value) and read
/// by both threads without a lock.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, FromRepr)]
pub enum State {
    Initializing,
    Initialized,
    WaitingForResume,
    Running,
    WaitingForStop,
    Exception,
}

impl State {
    /// No emulation work is in flight and the shared counters are stable.
    pub fn is_quiescent(self) -> bool {
        matches!(
            self,
            State::Initialized | State::WaitingForResume | State::WaitingForStop
        )
    }

    /// The worker is parked on the signal channel and will observe the next
    /// signal without finishing a step first.
    pub fn is_idle(self) -> bool {
        matches!(
            self,
            State::WaitingForResume | State::WaitingForStop | State::Exception
        )
    }

    /// States that end a `stop()` call.
    pub fn is_stopped(self) -> bool {
        matches!(self, State::WaitingForStop | State::Exception)
    }
}

/// One-shot command from the control thread to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Signal {
    Resume,
    Stop,
    Quit,
    None,
}

/// Atomically readable [`State`].
///
/// Stores use release and loads use acquire ordering, so once the control
/// thread observes a state every write the worker made before publishing it
/// is visible.
#[derive(Debug)]
pub struct AtomicState(AtomicU8);

impl AtomicState {
    pub fn new(state: State) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> State {
        // Only valid discriminants are ever stored.
        State::from_repr(self.0.load(Ordering::Acquire)).unwrap_or(State::Exception)
    }

    pub fn store(&self, state: State) {
        self.0.store(state as u8, Ordering::Release);
    }
}

impl Default for AtomicState {
    fn default() -> Self {
        Self::new(State::Initializing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_atomic_state_round_trips_every_state() {
        let atomic = AtomicState::default();
        assert_eq!(atomic.load(), State::Initializing);
        for state in State::iter() {
            atomic.store(state);
            assert_eq!(atomic.load(), state);
        }
    }

    #[test]
    fn test_state_classes() {
        let stopped: Vec<State> = State::iter().filter(|s| s.is_stopped()).collect();
        assert_eq!(stopped, vec![State::WaitingForStop, State::Exception]);

        assert!(State::Initialized.is_quiescent());
        assert!(!State::Running.is_quiescent());
        assert!(!State::Exception.is_quiescent());

        assert!(State::Exception.is_idle());
        assert!(!State::Initializing.is_idle());
        assert!(!State::Running.is_idle());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(State::WaitingForStop.to_string(), "WaitingForStop");
        assert_eq!(Signal::Quit.to_string(), "Quit");
        assert_eq!(Signal::iter().count(), 4);
    }
}
