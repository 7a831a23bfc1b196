/*++

Licensed under the Apache-2.0 license.

File Name:

    worker.rs

Abstract:

    Background thread that steps the emulated device in real time.

--*/

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::{anyhow, bail};
use emulator_consts::WORKER_THREAD_NAME;
use log::{debug, error, info, warn};

use crate::budget::CycleBudget;
use crate::channel::{SignalChannel, WakeupChannel};
use crate::clock::VirtualClock;
use crate::dispatch::{DispatchStatus, SharedDevice, SharedDispatchResult};
use crate::error::{DispatchFault, WorkerError, WorkerPanic};
use crate::state::{AtomicState, Signal, State};

/// Everything the worker needs for one run. Handed over by `start()`.
struct RunContext {
    budget: CycleBudget,
    result: SharedDispatchResult,
    device: SharedDevice,
    started_at: Instant,
}

/// State shared by the control thread and the worker thread.
#[derive(Default)]
struct Shared {
    state: AtomicState,
    signal: SignalChannel,
    wakeup: WakeupChannel,
    next_run: Mutex<Option<RunContext>>,
    pending_fault: Mutex<Option<DispatchFault>>,
    total_cycles: AtomicU64,
}

impl Shared {
    fn publish(&self, state: State) {
        debug!("emulation worker: {} -> {}", self.state.load(), state);
        self.wakeup.publish(&self.state, state);
    }

    fn take_fault(&self) -> Option<DispatchFault> {
        self.pending_fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

type Spawner = fn(Arc<Shared>) -> io::Result<JoinHandle<()>>;

fn spawn_worker_thread(shared: Arc<Shared>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(move || WorkerLoop::new(shared).run())
}

/// Runs an emulated device on a dedicated thread.
///
/// The thread is spawned by the first [`start`](Self::start) and lives until
/// the worker is dropped. Every `start()` must be paired with a
/// [`stop`](Self::stop), which returns the cycles emulated in between or the
/// fault the device raised.
pub struct EmulationWorker {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
    running: bool,
    bootstrap_error: Option<io::Error>,
    spawner: Spawner,
}

impl Default for EmulationWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl EmulationWorker {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            thread: None,
            running: false,
            bootstrap_error: None,
            spawner: spawn_worker_thread,
        }
    }

    #[cfg(test)]
    fn with_spawner(spawner: Spawner) -> Self {
        let mut worker = Self::new();
        worker.spawner = spawner;
        worker
    }

    /// Current phase of the worker thread.
    pub fn state(&self) -> State {
        self.shared.state.load()
    }

    /// Whether a run has been started and not yet stopped.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start emulating with the given pacing parameters.
    ///
    /// `result` and `device` stay shared with the caller; the worker only
    /// locks them while a step is in flight.
    pub fn start(
        &mut self,
        cycles_per_second: u32,
        max_cycles: u32,
        min_cycles: u32,
        result: SharedDispatchResult,
        device: SharedDevice,
    ) -> Result<(), WorkerError> {
        let budget = CycleBudget::new(cycles_per_second, min_cycles, max_cycles)?;
        self.start_with_budget(budget, result, device)
    }

    pub fn start_with_budget(
        &mut self,
        budget: CycleBudget,
        result: SharedDispatchResult,
        device: SharedDevice,
    ) -> Result<(), WorkerError> {
        if self.running {
            return Err(WorkerError::AlreadyRunning);
        }

        if self.thread.is_none() {
            if let Err(err) = self.spawn() {
                // Reported by the matching stop().
                error!("emulation worker: failed to spawn thread: {}", err);
                self.bootstrap_error = Some(err);
                self.running = true;
                return Ok(());
            }
        }

        *self
            .shared
            .next_run
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(RunContext {
            budget,
            result,
            device,
            started_at: Instant::now(),
        });
        self.shared.signal.send(Signal::Resume);
        self.running = true;

        Ok(())
    }

    /// Stop emulating and return the number of cycles run since `start()`.
    pub fn stop(&mut self) -> Result<u64, WorkerError> {
        if !self.running {
            return Err(WorkerError::NotStarted);
        }
        self.running = false;

        if let Some(err) = self.bootstrap_error.take() {
            return Err(WorkerError::Bootstrap(err));
        }

        self.shared.signal.send(Signal::Stop);
        let state = self
            .shared
            .wakeup
            .wait_for(&self.shared.state, State::is_stopped);

        if state == State::Exception {
            if let Some(fault) = self.shared.take_fault() {
                return Err(fault.into());
            }
        }
        debug_assert!(state.is_quiescent());

        Ok(self.shared.total_cycles.load(Ordering::Acquire))
    }

    fn spawn(&mut self) -> io::Result<()> {
        let handle = (self.spawner)(self.shared.clone())?;
        info!("emulation worker: spawned thread '{}'", WORKER_THREAD_NAME);

        // No signal may be sent before the thread is listening.
        self.shared
            .wakeup
            .wait_for(&self.shared.state, |state| state != State::Initializing);
        self.thread = Some(handle);
        Ok(())
    }
}

impl Drop for EmulationWorker {
    fn drop(&mut self) {
        // Quit is only ever sent to an idle worker.
        if self.running {
            match self.stop() {
                Ok(cycles) => debug!("emulation worker: stopped at teardown after {} cycles", cycles),
                Err(err) => warn!("emulation worker: discarding result at teardown: {}", err),
            }
        }

        if let Some(thread) = self.thread.take() {
            debug_assert!(self.state().is_idle(), "quit sent to a busy worker");
            self.shared.signal.send(Signal::Quit);
            if thread.join().is_err() {
                error!("emulation worker: thread panicked");
            } else {
                info!("emulation worker: thread joined");
            }
        }
    }
}

/// How a run ended.
enum Exit {
    /// Told to stop between steps.
    Stopped,
    /// The device reported a non-ok status.
    Halted(DispatchStatus),
    Faulted(anyhow::Error),
    Quit,
}

/// The worker side: owns virtual time and the cycle counter.
struct WorkerLoop {
    shared: Arc<Shared>,
    clock: VirtualClock,
    total_cycles: u64,
}

impl WorkerLoop {
    fn new(shared: Arc<Shared>) -> Self {
        shared.state.store(State::Initializing);
        Self {
            shared,
            clock: VirtualClock::new(Instant::now()),
            total_cycles: 0,
        }
    }

    fn run(mut self) {
        self.shared.publish(State::Initialized);
        self.shared.publish(State::WaitingForResume);

        loop {
            let signal = self.shared.signal.wait();
            let state = self.shared.state.load();
            debug!("emulation worker: received {} while {}", signal, state);

            match signal {
                Signal::Resume => {
                    if !self.resume() {
                        break;
                    }
                }
                // Already idle: acknowledge without doing any work.
                Signal::Stop => match state {
                    State::Exception => self.shared.publish(State::Exception),
                    _ => self.shared.publish(State::WaitingForStop),
                },
                Signal::Quit => break,
                Signal::None => {}
            }
        }

        debug!("emulation worker: quitting");
    }

    /// Execute one run. Returns false if the thread should quit.
    fn resume(&mut self) -> bool {
        let next_run = self
            .shared
            .next_run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        self.total_cycles = 0;
        self.shared.total_cycles.store(0, Ordering::Release);

        // `run` holds the caller's handles and is dropped before the run is
        // reported as stopped.
        let exit = match next_run {
            Some(run) => {
                self.clock.reset(run.started_at);
                self.shared.publish(State::Running);
                self.dispatch_emulation(&run)
            }
            None => Exit::Faulted(anyhow!("resumed without a run to execute")),
        };

        match exit {
            Exit::Stopped => self.shared.publish(State::WaitingForStop),
            Exit::Halted(status) => {
                // The caller inspects the dispatch result after stop().
                debug!("emulation worker: device halted with {}", status);
                self.shared.publish(State::WaitingForStop);
            }
            Exit::Faulted(err) => self.fault(err),
            Exit::Quit => return false,
        }
        true
    }

    fn dispatch_emulation(&mut self, run: &RunContext) -> Exit {
        loop {
            let budget = self.clock.budget(Instant::now(), &run.budget);

            let (status, cycles) = match Self::step(run, budget) {
                Ok(outcome) => outcome,
                Err(err) => return Exit::Faulted(err),
            };

            self.total_cycles += cycles;
            self.shared
                .total_cycles
                .store(self.total_cycles, Ordering::Release);
            self.clock.advance(cycles, &run.budget, Instant::now());

            if status != DispatchStatus::Ok {
                return Exit::Halted(status);
            }

            // Sleep until emulated time catches up, unless told otherwise. An
            // empty step waits for at least one cycle's worth of time. Any
            // signal ends the wait, so stop() never waits longer than a step.
            let deadline = if cycles == 0 {
                self.clock.deadline() + run.budget.duration_of(1)
            } else {
                self.clock.deadline()
            };
            let signal = if deadline > Instant::now() {
                self.shared.signal.wait_until(deadline)
            } else {
                self.shared.signal.poll()
            };

            match signal {
                Signal::Stop => return Exit::Stopped,
                Signal::Quit => return Exit::Quit,
                Signal::Resume | Signal::None => {}
            }
        }
    }

    /// Run one device step. Returns the status and the cycles consumed.
    fn step(run: &RunContext, budget: u64) -> anyhow::Result<(DispatchStatus, u64)> {
        let mut device = run
            .device
            .lock()
            .map_err(|_| anyhow!("device lock poisoned"))?;
        let mut result = run
            .result
            .lock()
            .map_err(|_| anyhow!("dispatch result lock poisoned"))?;

        result.reset();
        panic::catch_unwind(AssertUnwindSafe(|| device.dispatch(budget, &mut result)))
            .map_err(|payload| anyhow::Error::new(WorkerPanic::from_payload(payload)))??;

        if result.status() == DispatchStatus::Invalid {
            bail!("device returned without reporting a dispatch result");
        }
        if result.cycles() > budget {
            bail!(
                "device consumed {} cycles with a budget of {}",
                result.cycles(),
                budget
            );
        }

        Ok((result.status(), result.cycles()))
    }

    fn fault(&mut self, err: anyhow::Error) {
        error!(
            "emulation worker: fault after {} cycles: {:#}",
            self.total_cycles, err
        );
        *self
            .shared
            .pending_fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner) =
            Some(DispatchFault::new(err, self.total_cycles));
        self.shared.publish(State::Exception);
    }
}
