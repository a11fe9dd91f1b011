//! # Inbound Ports (Driving Ports / API)

use crate::domain::{LocalIdentity, SignatureError};
use shared_crypto::Ed25519KeyPair;
use shared_types::Envelope;

/// Signature Verification API.
///
/// Implementations must be thread-safe (`Send + Sync`).
pub trait SignatureVerificationApi: Send + Sync {
    /// Sign canonical bytes, returning a 128-char hex signature.
    fn sign(&self, bytes: &[u8], keypair: &Ed25519KeyPair) -> String;

    /// Verify a hex signature over `bytes` with a hex public key.
    ///
    /// # Security
    /// Fails closed: any malformed input is `false`, never an error.
    fn verify(&self, bytes: &[u8], signature: &str, public_key: &str) -> bool;

    /// Fill `envelope.signature` over its signing bytes.
    fn sign_envelope(&self, envelope: &mut Envelope, identity: &LocalIdentity);

    /// Verify an envelope against the sender's registered key.
    fn verify_envelope(&self, envelope: &Envelope, public_key: &str) -> Result<(), SignatureError>;
}
