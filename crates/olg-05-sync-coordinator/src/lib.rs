//! # OLG-05 Sync Coordinator
//!
//! Synchronization sessions with peer instances, and the processor for
//! envelopes peers send to this node.
//!
//! **Subsystem ID:** 5
//! **Architecture:** Hexagonal (Domain + Ports/Adapters)
//!
//! ## Session Outcome
//!
//! | Records synced | Errors | Status |
//! |----------------|--------|--------|
//! | any | 0 | `completed` |
//! | ≥ 1 | ≥ 1 | `partial` |
//! | 0 | ≥ 1 | `failed` |
//! | cancelled, or peer no longer eligible | | `failed` |
//!
//! ## Sync Types
//!
//! - **full**: pull everything the peer has
//! - **incremental**: pull records changed since the last completed session
//! - **bilateral**: incremental pull, then push local changes since the
//!   same watermark
//!
//! ## Module Structure
//!
//! ```text
//! olg-05-sync-coordinator/
//! ├── domain/     # wire payloads, ReplayGuard, errors
//! ├── ports/      # SyncCoordinatorApi, InboundApi, RecordSource/Sink, SessionStore
//! ├── adapters/   # InMemoryRecordStore, InMemorySessionStore
//! ├── service/    # SyncCoordinator, InboundProcessor
//! └── config.rs   # SyncConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{InMemoryRecordStore, InMemorySessionStore};
pub use config::SyncConfig;
pub use domain::{
    InboundError, RecordRejection, ReplayError, ReplayGuard, SyncDirection, SyncError,
    SyncRequestPayload, SyncResponsePayload, SUBJECT_PULL, SUBJECT_PUSH,
};
pub use ports::{
    ApplyOutcome, InboundApi, InboundReply, RecordPage, RecordSink, RecordSource, SessionStore,
    SyncCoordinatorApi, SyncStoreError,
};
pub use service::{FederationServices, InboundProcessor, SyncCoordinator, SyncHandle};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
