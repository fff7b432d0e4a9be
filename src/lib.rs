//! Memory-mapped register bank model for validation-style testing: field-level
//! access, breakpoints on access and atomically swappable shadow sets.

pub mod demo;
pub mod script;
pub mod soc;

pub use soc::device::AccessContext;
pub use soc::register::{
    BankConfig, BreakCondition, Breakpoint, BreakpointEvent, BreakpointHandler, BreakpointId,
    EventLog, FieldAccess, FieldSpec, RegisterBank, RegisterError, RegisterResult, RegisterSpec,
    RegisterWidth, SharedBank,
};
