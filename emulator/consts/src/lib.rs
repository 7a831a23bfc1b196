/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Timing constants of the emulated console and the pacing profiles
    derived from them.

--*/

/// CPU cycles per scanline. The TIA draws one line every 76 CPU cycles.
pub const CYCLES_PER_SCANLINE: u32 = 76;

pub const NTSC_SCANLINES: u32 = 262;
pub const NTSC_FRAME_RATE: u32 = 60;

pub const PAL_SCANLINES: u32 = 312;
pub const PAL_FRAME_RATE: u32 = 50;

pub const NTSC_CYCLES_PER_FRAME: u32 = CYCLES_PER_SCANLINE * NTSC_SCANLINES;
pub const PAL_CYCLES_PER_FRAME: u32 = CYCLES_PER_SCANLINE * PAL_SCANLINES;

pub const NTSC_CYCLES_PER_SECOND: u32 = NTSC_CYCLES_PER_FRAME * NTSC_FRAME_RATE;
pub const PAL_CYCLES_PER_SECOND: u32 = PAL_CYCLES_PER_FRAME * PAL_FRAME_RATE;

/// Smallest timeslice handed to the device: a single scanline.
pub const DEFAULT_MIN_CYCLES: u32 = CYCLES_PER_SCANLINE;

/// Largest timeslice handed to the device: one full NTSC frame.
pub const DEFAULT_MAX_CYCLES: u32 = NTSC_CYCLES_PER_FRAME;

/// Name given to the background emulation thread.
pub const WORKER_THREAD_NAME: &str = "emulation-worker";
