//! # Domain Module
//!
//! Sync wire payloads, the replay guard and errors. Session and record
//! types live in `shared-types`.

pub mod errors;
pub mod protocol;
pub mod replay;

pub use errors::{InboundError, SyncError};
pub use protocol::{
    RecordRejection, SyncDirection, SyncRequestPayload, SyncResponsePayload, SUBJECT_PULL,
    SUBJECT_PUSH,
};
pub use replay::{ReplayError, ReplayGuard};
