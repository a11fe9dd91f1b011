//! # Shared Types Crate
//!
//! Domain entities shared by every federation crate.
//!
//! ## Contents
//!
//! - **Instances**: peer identity records and their moderated status lifecycle.
//! - **Messages**: the wire [`Envelope`] and the locally tracked
//!   [`FederationMessage`] with its forward-only delivery status.
//! - **Sync sessions**: one synchronization run against one instance.
//! - **Entity references**: the closed `(kind, id)` pair that replaces
//!   polymorphic foreign keys in audit and sync records.
//! - **Time**: the [`TimeSource`] port so lifecycle stamps are testable.

#![warn(missing_docs)]

pub mod entities;
pub mod entity_ref;
pub mod envelope;
pub mod errors;
pub mod time;

pub use entities::*;
pub use entity_ref::{AuditRecord, EntityKind, EntityRef, SyncRecord};
pub use envelope::Envelope;
pub use errors::{FederationError, TransitionError};
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource, Timestamp};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
