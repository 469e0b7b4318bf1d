//! The shared quantum.
//!
//! A single machine word shared by every caller. Each individual load or
//! store is atomic; sequences of them are not. `exchange` and `shift` are a
//! separate load followed by a separate store, so two concurrent callers can
//! both observe the same previous value. The store is a best-effort shared
//! setting, not a synchronization primitive.

use std::sync::atomic::{AtomicI32, Ordering};

use qctl_core::constants::DEFAULT_QUANTUM;
use qctl_core::protocol::UserRegion;

use crate::error::GatewayError;
use crate::memory::CallerMemory;

#[derive(Debug)]
pub struct ParameterStore {
    quantum: AtomicI32,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new(DEFAULT_QUANTUM)
    }
}

impl ParameterStore {
    /// Create a store starting at `initial`. `reset` still restores
    /// [`DEFAULT_QUANTUM`].
    pub fn new(initial: i32) -> Self {
        Self {
            quantum: AtomicI32::new(initial),
        }
    }

    fn load(&self) -> i32 {
        self.quantum.load(Ordering::Relaxed)
    }

    fn store(&self, value: i32) {
        self.quantum.store(value, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.store(DEFAULT_QUANTUM);
    }

    /// Read the new value from caller memory.
    pub fn set_from(&self, region: &UserRegion) -> Result<(), GatewayError> {
        let value = region.get_int()?;
        self.store(value);
        Ok(())
    }

    /// Store a value passed directly.
    pub fn tell(&self, value: i32) {
        self.store(value);
    }

    /// Write the current value into caller memory.
    pub fn get_into(&self, region: &mut UserRegion) -> Result<(), GatewayError> {
        region.put_int(self.load())
    }

    /// Current value, returned as the call's result code.
    pub fn query(&self) -> i32 {
        self.load()
    }

    /// Swap the caller's value in and write the previous value back.
    pub fn exchange(&self, region: &mut UserRegion) -> Result<(), GatewayError> {
        let previous = self.load();
        let value = region.get_int()?;
        self.store(value);
        region.put_int(previous)
    }

    /// Store `value`, returning the previous one.
    pub fn shift(&self, value: i32) -> i32 {
        let previous = self.load();
        self.store(value);
        previous
    }
}
