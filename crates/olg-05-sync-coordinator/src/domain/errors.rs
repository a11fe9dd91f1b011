//! # Sync Errors

use olg_01_instance_registry::RegistryError;
use olg_02_envelope_codec::CodecError;
use olg_03_signature_verification::SignatureError;
use shared_types::{FederationError, InstanceId, InstanceStatus, SessionId};
use thiserror::Error;

use super::replay::ReplayError;

/// Errors from starting, cancelling or querying sync sessions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// Registry lookup failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Peer is not `active`.
    #[error("Instance {instance} is {status}, not active")]
    PeerNotActive {
        /// Instance id.
        instance: InstanceId,
        /// Its current status.
        status: InstanceStatus,
    },

    /// Peer is not trusted and trust is required.
    #[error("Instance {0} is not trusted")]
    PeerNotTrusted(InstanceId),

    /// The peer never issued this node a credential.
    #[error("No outbound credential for instance {0}")]
    MissingCredential(InstanceId),

    /// A session with this instance is already running.
    #[error("Session {session} is already running for instance {instance}")]
    AlreadyRunning {
        /// Instance id.
        instance: InstanceId,
        /// The running session.
        session: SessionId,
    },

    /// No such session.
    #[error("Sync session {0} not found")]
    SessionNotFound(SessionId),

    /// The session has already finished.
    #[error("Sync session {0} is not running")]
    NotRunning(SessionId),

    /// Session or record persistence failed.
    #[error("Sync storage error: {0}")]
    Store(String),

    /// The session task ended abnormally.
    #[error("Sync task failed: {0}")]
    Task(String),
}

impl From<SyncError> for FederationError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Registry(e) => e.into(),
            SyncError::SessionNotFound(id) => FederationError::NotFound(format!("sync session {id}")),
            SyncError::Store(reason) => FederationError::Storage(reason),
            other => FederationError::Validation(other.to_string()),
        }
    }
}

/// Why an inbound federation call was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InboundError {
    /// Credential missing or unknown.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated peer may not exchange messages.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Envelope could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Envelope is addressed to another instance.
    #[error("Envelope addressed to '{actual}', this instance is '{expected}'")]
    Misaddressed {
        /// This node's domain.
        expected: String,
        /// The envelope's `to`.
        actual: String,
    },

    /// Signature does not verify against the sender's registered key.
    #[error("Invalid signature: {0}")]
    SignatureInvalid(#[from] SignatureError),

    /// Envelope id already seen, or timestamp outside the window.
    #[error(transparent)]
    Replay(#[from] ReplayError),

    /// Payload does not match the message type.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Local failure while handling a valid message.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl InboundError {
    /// HTTP status for the federation endpoint.
    pub fn status_code(&self) -> u16 {
        match self {
            InboundError::Unauthorized(_) | InboundError::SignatureInvalid(_) => 401,
            InboundError::Forbidden(_) => 403,
            InboundError::Codec(_) => 400,
            InboundError::Replay(ReplayError::Reused(_)) => 409,
            InboundError::Misaddressed { .. }
            | InboundError::Replay(_)
            | InboundError::InvalidPayload(_) => 422,
            InboundError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code, used in error bodies, events and metrics.
    pub fn reason_code(&self) -> &'static str {
        match self {
            InboundError::Unauthorized(_) => "unauthorized",
            InboundError::Forbidden(_) => "forbidden",
            InboundError::Codec(_) => "malformed_envelope",
            InboundError::Misaddressed { .. } => "misaddressed",
            InboundError::SignatureInvalid(_) => "signature_invalid",
            InboundError::Replay(ReplayError::Reused(_)) => "replay",
            InboundError::Replay(_) => "stale_message",
            InboundError::InvalidPayload(_) => "invalid_payload",
            InboundError::Internal(_) => "internal_error",
        }
    }
}

impl From<InboundError> for FederationError {
    fn from(err: InboundError) -> Self {
        match err {
            InboundError::Unauthorized(reason) | InboundError::Forbidden(reason) => {
                FederationError::Unauthorized(reason)
            }
            InboundError::Codec(e) => e.into(),
            InboundError::SignatureInvalid(e) => e.into(),
            InboundError::Replay(e) => FederationError::ReplayDetected(e.to_string()),
            InboundError::Internal(reason) => FederationError::Storage(reason),
            other => FederationError::Validation(other.to_string()),
        }
    }
}
