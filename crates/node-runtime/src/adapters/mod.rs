//! # Runtime Adapters
//!
//! Stores owned by the runtime rather than by a subsystem.

mod audit_log;

pub use audit_log::InMemoryAuditLog;
