//! # Signature Errors

use shared_types::FederationError;
use thiserror::Error;

/// Signature failures. Verification never distinguishes these to the
/// remote side; they exist for logs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// Public key is not valid Ed25519 hex.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Signature is not 128 hex characters.
    #[error("Invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    /// Envelope carries no signature.
    #[error("Envelope is unsigned")]
    Unsigned,

    /// Signature does not match the bytes and key.
    #[error("Signature verification failed")]
    VerificationFailed,

    /// Signing seed could not be loaded.
    #[error("Invalid signing seed: {0}")]
    InvalidSeed(String),
}

impl From<SignatureError> for FederationError {
    fn from(err: SignatureError) -> Self {
        FederationError::SignatureInvalid(err.to_string())
    }
}
