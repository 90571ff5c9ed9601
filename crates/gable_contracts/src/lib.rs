#![forbid(unsafe_code)]

pub mod common;
pub mod ids;
pub mod record;
pub mod section;
pub mod session;
pub mod validation;

pub use common::{ContractViolation, MonotonicTimeNs, ReasonCodeId, SchemaVersion, Validate};
