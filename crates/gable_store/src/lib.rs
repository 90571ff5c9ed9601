#![forbid(unsafe_code)]

pub mod audit;
pub mod session;

pub use audit::{AuditEvent, AuditTrail};
pub use session::{SessionStore, StorageError};
