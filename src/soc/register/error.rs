use std::error::Error as StdError;

use thiserror::Error;

pub type RegisterResult<T> = Result<T, RegisterError>;

/// Boxed failure reported by a breakpoint handler.
pub type HandlerError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("address 0x{address:08X} is already registered")]
    DuplicateAddress { address: u64 },
    #[error("register '{register}' has an invalid field layout: {reason}")]
    InvalidFieldLayout { register: String, reason: String },
    #[error("address 0x{address:08X} is not registered")]
    UnknownAddress { address: u64 },
    #[error("register at 0x{address:08X} has no field '{field}'")]
    UnknownField { address: u64, field: String },
    #[error("write to 0x{address:08X} touches read-only field '{field}'")]
    WriteToReadOnly { address: u64, field: String },
    #[error("value 0x{value:X} does not fit {width}-bit '{field}' at 0x{address:08X}")]
    ValueOutOfRange {
        address: u64,
        field: String,
        value: u64,
        width: u32,
    },
    #[error("shadow set '{name}' has not been saved")]
    UnknownShadowSet { name: String },
    #[error("breakpoint handler failed on access to 0x{address:08X}")]
    Handler {
        address: u64,
        #[source]
        source: HandlerError,
    },
}

impl RegisterError {
    pub(crate) fn layout(register: &str, reason: impl Into<String>) -> Self {
        RegisterError::InvalidFieldLayout {
            register: register.to_string(),
            reason: reason.into(),
        }
    }
}
