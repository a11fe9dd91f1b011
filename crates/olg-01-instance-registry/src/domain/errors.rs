//! # Registry Errors

use crate::ports::outbound::StoreError;
use shared_types::{FederationError, InstanceId, TransitionError};
use thiserror::Error;

/// Errors returned by the instance registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Domain, name or credential already taken.
    #[error("Duplicate instance: {field} '{value}' is already registered")]
    DuplicateInstance {
        /// The unique field that collided.
        field: &'static str,
        /// The colliding value.
        value: String,
    },

    /// No instance with this id.
    #[error("Instance not found: {0}")]
    NotFound(InstanceId),

    /// No instance with this domain.
    #[error("No instance registered for domain '{0}'")]
    DomainNotFound(String),

    /// The requested status change is not allowed.
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// Another writer updated the instance first.
    #[error("Instance {id} was modified concurrently (expected version {expected}, found {actual})")]
    ConcurrentModification {
        /// Instance id.
        id: InstanceId,
        /// Version the writer read.
        expected: u64,
        /// Version found at write time.
        actual: u64,
    },

    /// Public key is not valid Ed25519 hex.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// API URL is not an acceptable http(s) URL.
    #[error("Invalid API URL '{0}'")]
    InvalidApiUrl(String),

    /// Another registration field failed validation.
    #[error("Invalid {field}: {reason}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Credential does not belong to any instance.
    #[error("Unknown API credential")]
    Unauthorized,

    /// Storage backend failure.
    #[error("Registry storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { field, value } => RegistryError::DuplicateInstance { field, value },
            StoreError::NotFound(id) => RegistryError::NotFound(id),
            StoreError::VersionConflict {
                id,
                expected,
                actual,
            } => RegistryError::ConcurrentModification {
                id,
                expected,
                actual,
            },
            StoreError::Backend(reason) => RegistryError::Storage(reason),
        }
    }
}

impl From<RegistryError> for FederationError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateInstance { field, value } => FederationError::DuplicateInstance {
                field: field.to_string(),
                value,
            },
            RegistryError::NotFound(id) => FederationError::NotFound(format!("instance {id}")),
            RegistryError::DomainNotFound(domain) => {
                FederationError::NotFound(format!("instance for domain {domain}"))
            }
            RegistryError::InvalidTransition(e) => FederationError::InvalidTransition(e),
            RegistryError::ConcurrentModification { id, .. } => {
                FederationError::ConcurrentModification(format!("instance {id}"))
            }
            RegistryError::Unauthorized => FederationError::Unauthorized("unknown API credential".into()),
            RegistryError::Storage(reason) => FederationError::Storage(reason),
            other @ (RegistryError::InvalidPublicKey(_)
            | RegistryError::InvalidApiUrl(_)
            | RegistryError::InvalidField { .. }) => FederationError::Validation(other.to_string()),
        }
    }
}
