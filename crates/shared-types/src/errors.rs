//! # Error Types
//!
//! The federation error taxonomy. Each crate keeps its own `thiserror` enum
//! and converts into [`FederationError`] at the crate boundary.

use thiserror::Error;

/// A lifecycle transition that the state machine does not allow.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{entity} cannot move from {from} to {to}")]
pub struct TransitionError {
    /// Which state machine rejected the move (`instance`, `message`, `sync session`).
    pub entity: &'static str,
    /// Current state.
    pub from: String,
    /// Requested state.
    pub to: String,
}

impl TransitionError {
    /// Build a transition error from any displayable states.
    pub fn new(entity: &'static str, from: impl ToString, to: impl ToString) -> Self {
        Self {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// Errors that cross crate boundaries in the federation engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FederationError {
    /// An instance with the same domain, name or credential already exists.
    #[error("Duplicate instance: {field} '{value}' is already registered")]
    DuplicateInstance {
        /// The unique field that collided.
        field: String,
        /// The colliding value.
        value: String,
    },

    /// The referenced record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A lifecycle transition was rejected.
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// A concurrent writer updated the record first.
    #[error("Concurrent modification of {0}")]
    ConcurrentModification(String),

    /// Bytes could not be decoded into a well-formed envelope.
    #[error("Codec error: {0}")]
    Codec(String),

    /// The envelope signature does not verify against the sender's key.
    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    /// Delivery failed but may succeed on retry.
    #[error("Transient delivery error: {0}")]
    TransientDelivery(String),

    /// Delivery failed and will not be retried.
    #[error("Permanent delivery error: {0}")]
    PermanentDelivery(String),

    /// The caller's credential is unknown or not allowed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A message id was seen again inside the replay window.
    #[error("Replay detected: {0}")]
    ReplayDetected(String),

    /// The operation was cancelled before it finished.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Input failed validation.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A storage backend failed.
    #[error("Storage error: {0}")]
    Storage(String),
}
