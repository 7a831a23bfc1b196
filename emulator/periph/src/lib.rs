/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the emulator peripherals.

--*/

mod external_shim;
mod scanline_counter;

pub use external_shim::Shim;
pub use scanline_counter::{CounterFault, ScanlineCounter};
