// Licensed under the Apache-2.0 license

//! Integration test driving the front-end through its library API

use emulator::{Emulator, EmulatorArgs, SystemStepAction, WorkerError, EMULATOR_RUNNING};
use std::sync::atomic::Ordering;

fn args() -> EmulatorArgs {
    EmulatorArgs {
        cycles_per_second: Some(1_000_000),
        min_cycles: 100,
        max_cycles: Some(10_000),
        frame_rate: Some(200),
        ..EmulatorArgs::default()
    }
}

#[test]
fn test_library_api_access() {
    assert!(EMULATOR_RUNNING.load(Ordering::Relaxed));
}

#[test]
fn test_frames_accumulate_cycles() {
    let mut emulator = Emulator::from_args(&args()).unwrap();
    for _ in 0..5 {
        assert_eq!(emulator.run_frame().unwrap(), SystemStepAction::Continue);
    }
    assert_eq!(emulator.frames(), 5);
    assert!(emulator.total_cycles() >= 5 * 100);
    assert_eq!(emulator.total_cycles(), emulator.device_cycles());
}

#[test]
fn test_pal_frames_run() {
    let mut emulator = Emulator::from_args(&EmulatorArgs {
        pal: true,
        ..args()
    })
    .unwrap();
    assert_eq!(emulator.run_frame().unwrap(), SystemStepAction::Continue);
    assert_eq!(emulator.total_cycles(), emulator.device_cycles());
}

#[test]
fn test_breakpoint_breaks_once() {
    let mut emulator = Emulator::from_args(&EmulatorArgs {
        breakpoint: Some(150),
        ..args()
    })
    .unwrap();

    // The first step consumes at least 100 cycles; the breakpoint fires by the
    // end of the second step at the latest.
    let mut actions = Vec::new();
    for _ in 0..3 {
        actions.push(emulator.run_frame().unwrap());
    }
    assert_eq!(
        actions.iter().filter(|a| **a == SystemStepAction::Break).count(),
        1
    );
    assert_eq!(actions[0], SystemStepAction::Break);
}

#[test]
fn test_device_fault_surfaces_from_run_frame() {
    let mut emulator = Emulator::from_args(&EmulatorArgs {
        fault_after: Some(1),
        ..args()
    })
    .unwrap();

    match emulator.run_frame() {
        Err(WorkerError::Dispatch(fault)) => {
            assert_eq!(fault.cycles_before_fault(), 0);
            assert!(fault.to_string().contains("injected fault on dispatch 1"));
        }
        other => panic!("expected a dispatch fault, got {:?}", other),
    }
    assert_eq!(emulator.frames(), 0);

    // The fault has been consumed; the next frame runs normally.
    assert_eq!(emulator.run_frame().unwrap(), SystemStepAction::Continue);
}
