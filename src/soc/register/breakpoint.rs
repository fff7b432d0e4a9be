//! Breakpoint conditions, the events they raise and the handler seam that
//! receives them.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use super::error::HandlerError;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BreakCondition {
    OnWrite,
    OnRead,
    OnValueEquals(u64),
    OnFieldChange(String),
}

impl fmt::Display for BreakCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakCondition::OnWrite => f.write_str("on-write"),
            BreakCondition::OnRead => f.write_str("on-read"),
            BreakCondition::OnValueEquals(value) => write!(f, "on-value == 0x{value:X}"),
            BreakCondition::OnFieldChange(field) => write!(f, "on-change of '{field}'"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Breakpoint {
    pub address: u64,
    pub condition: BreakCondition,
    pub enabled: bool,
}

impl Breakpoint {
    pub fn new(address: u64, condition: BreakCondition) -> Self {
        Self {
            address,
            condition,
            enabled: true,
        }
    }

    pub fn on_write(address: u64) -> Self {
        Self::new(address, BreakCondition::OnWrite)
    }

    pub fn on_read(address: u64) -> Self {
        Self::new(address, BreakCondition::OnRead)
    }

    pub fn on_value(address: u64, value: u64) -> Self {
        Self::new(address, BreakCondition::OnValueEquals(value))
    }

    pub fn on_field_change(address: u64, field: impl Into<String>) -> Self {
        Self::new(address, BreakCondition::OnFieldChange(field.into()))
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Handle returned by `add_breakpoint`. Identifiers are never reused within a bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BreakpointId(pub(crate) u64);

impl fmt::Display for BreakpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Raised once per matching breakpoint. `old`/`new` are raw register values;
/// reads report the same value for both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BreakpointEvent {
    pub id: BreakpointId,
    pub address: u64,
    pub condition: BreakCondition,
    pub old: u64,
    pub new: u64,
    /// Decoded field values before/after for `OnFieldChange` hits.
    pub field_values: Option<(u64, u64)>,
}

/// Receives breakpoint hits synchronously, inside the triggering access.
/// An error is returned to the caller of that access.
pub trait BreakpointHandler: Send {
    fn on_trigger(&mut self, event: &BreakpointEvent) -> Result<(), HandlerError>;
}

impl<F> BreakpointHandler for F
where
    F: FnMut(&BreakpointEvent) -> Result<(), HandlerError> + Send,
{
    fn on_trigger(&mut self, event: &BreakpointEvent) -> Result<(), HandlerError> {
        self(event)
    }
}

/// Shared recorder for breakpoint events. Clones append to the same log, so one
/// clone can be installed on the bank while another is inspected by a test.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<BreakpointEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<BreakpointEvent>> {
        self.events.lock().unwrap_or_else(|err| err.into_inner())
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// Drains the recorded events.
    pub fn take(&self) -> Vec<BreakpointEvent> {
        std::mem::take(&mut *self.guard())
    }

    pub fn ids(&self) -> Vec<BreakpointId> {
        self.guard().iter().map(|event| event.id).collect()
    }
}

impl BreakpointHandler for EventLog {
    fn on_trigger(&mut self, event: &BreakpointEvent) -> Result<(), HandlerError> {
        self.guard().push(event.clone());
        Ok(())
    }
}
