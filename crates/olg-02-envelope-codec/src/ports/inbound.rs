//! # Inbound Ports (Driving Ports / API)

use crate::domain::CodecError;
use shared_types::Envelope;

/// Envelope codec API.
///
/// `decode(encode(e)) == e` for every envelope `decode` accepts.
pub trait EnvelopeCodecApi: Send + Sync {
    /// Canonical bytes of every field except `signature`.
    fn signing_bytes(&self, envelope: &Envelope) -> Vec<u8>;

    /// Canonical bytes of the whole envelope, signature included.
    fn encode(&self, envelope: &Envelope) -> Vec<u8>;

    /// Parse and validate wire bytes.
    ///
    /// # Errors
    ///
    /// - `TooLarge` above the configured size limit
    /// - `Malformed` for invalid JSON or a non-object document
    /// - `MissingField` / `UnknownField` when the key set is not exact
    /// - `UnknownMessageType` for an unrecognized `type`
    /// - `InvalidField` for empty domains, a bad id, timestamp or signature
    fn decode(&self, bytes: &[u8]) -> Result<Envelope, CodecError>;
}
