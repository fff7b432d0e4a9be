pub mod context;

pub use context::AccessContext;
