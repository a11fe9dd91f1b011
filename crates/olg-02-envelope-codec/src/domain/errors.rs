//! # Codec Errors

use shared_types::FederationError;
use thiserror::Error;

/// Reasons an envelope cannot be decoded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Input is not a JSON object.
    #[error("Malformed envelope: {0}")]
    Malformed(String),

    /// A required field is absent.
    #[error("Missing field '{0}'")]
    MissingField(&'static str),

    /// A field outside the envelope schema is present.
    #[error("Unknown field '{0}'")]
    UnknownField(String),

    /// The `type` field names no known message type.
    #[error("Unknown message type '{0}'")]
    UnknownMessageType(String),

    /// A field has the wrong shape.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// Input exceeds the configured ceiling.
    #[error("Envelope of {size} bytes exceeds limit of {max} bytes")]
    TooLarge {
        /// Input size.
        size: usize,
        /// Configured limit.
        max: usize,
    },
}

impl From<CodecError> for FederationError {
    fn from(err: CodecError) -> Self {
        FederationError::Codec(err.to_string())
    }
}
