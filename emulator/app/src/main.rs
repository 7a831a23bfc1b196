/*++

Licensed under the Apache-2.0 license.

File Name:

    main.rs

Abstract:

    File contains main entrypoint for the emulation worker demo.

--*/

use std::io::{self, IsTerminal};
use std::sync::atomic::Ordering;

use anyhow::Context;
use clap::Parser;
use emulator::{Emulator, EmulatorArgs, SystemStepAction, EMULATOR_RUNNING};
use log::{error, info};
use simple_logger::SimpleLogger;

// Frame loop: one start()/stop() pair per host frame.
fn free_run(mut emulator: Emulator, frames: Option<u64>) -> anyhow::Result<()> {
    while EMULATOR_RUNNING.load(Ordering::Relaxed) {
        if frames.is_some_and(|frames| emulator.frames() >= frames) {
            break;
        }

        match emulator.run_frame() {
            Ok(SystemStepAction::Continue) => {}
            // Breakpoints are reported by run_frame(); keep going.
            Ok(SystemStepAction::Break) => {}
            Ok(SystemStepAction::Exit) => break,
            Err(err) => {
                error!("Emulation stopped after {} frames: {}", emulator.frames(), err);
                return Err(err.into());
            }
        }
    }

    info!(
        "Emulated {} cycles in {} frames (device counted {})",
        emulator.total_cycles(),
        emulator.frames(),
        emulator.device_cycles()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = EmulatorArgs::parse();

    SimpleLogger::new()
        .with_level(cli.log_level)
        .env()
        .init()
        .context("failed to initialize logging")?;

    // exit cleanly on Ctrl-C so that the worker thread is joined.
    if io::stdout().is_terminal() {
        ctrlc::set_handler(move || {
            EMULATOR_RUNNING.store(false, Ordering::Relaxed);
        })
        .context("failed to install Ctrl-C handler")?;
    }

    let emulator = Emulator::from_args(&cli)?;
    free_run(emulator, cli.frames)
}
