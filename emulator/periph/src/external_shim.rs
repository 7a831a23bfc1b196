/*++

Licensed under the Apache-2.0 license.

File Name:

    external_shim.rs

Abstract:

    File contains a shim that lets an external step function act as the
    emulated device.

--*/

use anyhow::bail;
use emulator_worker::{Device, DispatchResult};

type DispatchCallback = Box<dyn FnMut(u64, &mut DispatchResult) -> anyhow::Result<()> + Send>;

pub struct Shim {
    dispatch_callback: Option<DispatchCallback>,
    dispatches: u64,
}

impl Default for Shim {
    fn default() -> Self {
        Self::new()
    }
}

impl Shim {
    pub fn new() -> Self {
        Self {
            dispatch_callback: None,
            dispatches: 0,
        }
    }

    /// Create a shim with a dispatch callback already registered.
    pub fn with_callback<F>(callback: F) -> Self
    where
        F: FnMut(u64, &mut DispatchResult) -> anyhow::Result<()> + Send + 'static,
    {
        let mut shim = Self::new();
        shim.set_dispatch_callback(callback);
        shim
    }

    /// Register a dispatch callback
    pub fn set_dispatch_callback<F>(&mut self, callback: F)
    where
        F: FnMut(u64, &mut DispatchResult) -> anyhow::Result<()> + Send + 'static,
    {
        self.dispatch_callback = Some(Box::new(callback));
    }

    pub fn clear_dispatch_callback(&mut self) {
        self.dispatch_callback = None;
    }

    /// Number of steps forwarded to the callback so far.
    pub fn dispatches(&self) -> u64 {
        self.dispatches
    }
}

impl Device for Shim {
    /// Forward one step to the registered callback
    ///
    /// # Arguments
    ///
    /// * `budget` - Maximum number of cycles the step may consume
    /// * `result` - Outcome of the step, filled in by the callback
    ///
    /// # Error
    ///
    /// * Whatever the callback returns, or an error when no callback has been
    ///   registered
    fn dispatch(&mut self, budget: u64, result: &mut DispatchResult) -> anyhow::Result<()> {
        let Some(callback) = self.dispatch_callback.as_mut() else {
            bail!("no dispatch callback registered");
        };
        self.dispatches += 1;
        callback(budget, result)
    }
}
