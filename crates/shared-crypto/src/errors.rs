//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Input is not valid hex.
    #[error("Invalid hex encoding: {0}")]
    InvalidHex(String),

    /// Decoded bytes have the wrong length.
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Bytes are not a valid Ed25519 point
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Seed is all zeroes or otherwise unusable
    #[error("Invalid private key")]
    InvalidPrivateKey,
}
