pub mod bank;
pub mod breakpoint;
pub mod config;
pub mod error;
pub mod field;
pub mod history;
pub mod report;
pub mod shadow;
pub mod shared;
pub mod spec;

pub use bank::RegisterBank;
pub use breakpoint::{BreakCondition, Breakpoint, BreakpointEvent, BreakpointHandler, BreakpointId, EventLog};
pub use config::BankConfig;
pub use error::{HandlerError, RegisterError, RegisterResult};
pub use field::{FieldAccess, FieldSpec};
pub use history::{AccessKind, AccessRecord};
pub use report::{FieldReport, RegisterReport};
pub use shadow::{RegisterState, ShadowSet};
pub use shared::SharedBank;
pub use spec::{RegisterSpec, RegisterSpecBuilder, RegisterWidth};
