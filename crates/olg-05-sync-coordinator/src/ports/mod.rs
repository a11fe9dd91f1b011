//! # Ports Layer
//!
//! - **Inbound (Driving)**: [`SyncCoordinatorApi`], [`InboundApi`]
//! - **Outbound (Driven)**: [`RecordSource`], [`RecordSink`], [`SessionStore`]

pub mod inbound;
pub mod outbound;

pub use inbound::{InboundApi, InboundReply, SyncCoordinatorApi};
pub use outbound::{ApplyOutcome, RecordPage, RecordSink, RecordSource, SessionStore, SyncStoreError};
