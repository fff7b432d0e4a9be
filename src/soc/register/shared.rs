//! Thread-safe handle over a [`RegisterBank`]. One bank-wide lock serializes every
//! operation; it is held for exactly one call.
use std::sync::{Arc, Mutex, MutexGuard};

use super::{
    bank::RegisterBank,
    breakpoint::{Breakpoint, BreakpointId},
    error::RegisterResult,
    shadow::RegisterState,
    spec::RegisterSpec,
};

#[derive(Clone)]
pub struct SharedBank {
    inner: Arc<Mutex<RegisterBank>>,
}

impl SharedBank {
    pub fn new(bank: RegisterBank) -> Self {
        Self {
            inner: Arc::new(Mutex::new(bank)),
        }
    }

    // A panicking handler cannot leave the bank half-written: values are
    // committed before handlers run, so a poisoned lock is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, RegisterBank> {
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Runs `f` with the lock held, for sequences that must not interleave.
    pub fn with<R>(&self, f: impl FnOnce(&mut RegisterBank) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn register(&self, spec: RegisterSpec) -> RegisterResult<()> {
        self.lock().register(spec)
    }

    pub fn read(&self, address: u64) -> RegisterResult<u64> {
        self.lock().read(address)
    }

    pub fn write(&self, address: u64, value: u64) -> RegisterResult<()> {
        self.lock().write(address, value)
    }

    pub fn write_masked(&self, address: u64, value: u64, mask: u64) -> RegisterResult<()> {
        self.lock().write_masked(address, value, mask)
    }

    pub fn read_field(&self, address: u64, field: &str) -> RegisterResult<u64> {
        self.lock().read_field(address, field)
    }

    pub fn write_field(&self, address: u64, field: &str, value: u64) -> RegisterResult<()> {
        self.lock().write_field(address, field, value)
    }

    pub fn reset(&self, address: Option<u64>) -> RegisterResult<()> {
        self.lock().reset(address)
    }

    pub fn add_breakpoint(&self, breakpoint: Breakpoint) -> RegisterResult<BreakpointId> {
        self.lock().add_breakpoint(breakpoint)
    }

    pub fn remove_breakpoint(&self, id: BreakpointId) -> Option<Breakpoint> {
        self.lock().remove_breakpoint(id)
    }

    pub fn save_shadow(&self, name: &str) {
        self.lock().save_shadow(name)
    }

    pub fn activate_shadow(&self, name: &str) -> RegisterResult<()> {
        self.lock().activate_shadow(name)
    }

    pub fn snapshot(&self) -> Vec<RegisterState> {
        self.lock().snapshot()
    }
}

impl From<RegisterBank> for SharedBank {
    fn from(bank: RegisterBank) -> Self {
        Self::new(bank)
    }
}
