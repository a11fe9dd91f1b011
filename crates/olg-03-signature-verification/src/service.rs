//! # Signature Verification Service
//!
//! Implements [`SignatureVerificationApi`], delegating canonicalization to
//! the envelope codec and the Ed25519 math to the domain layer.

use crate::domain::{sign_hex, verify_hex, LocalIdentity, SignatureError};
use crate::ports::inbound::SignatureVerificationApi;
use olg_02_envelope_codec::{EnvelopeCodec, EnvelopeCodecApi};
use shared_crypto::Ed25519KeyPair;
use shared_types::Envelope;
use tracing::{debug, warn};

/// Signature verifier.
#[derive(Debug, Clone, Default)]
pub struct SignatureVerifier {
    codec: EnvelopeCodec,
}

impl SignatureVerifier {
    /// Create a verifier that canonicalizes with `codec`.
    pub fn new(codec: EnvelopeCodec) -> Self {
        Self { codec }
    }

    /// Codec used for signing bytes.
    pub fn codec(&self) -> &EnvelopeCodec {
        &self.codec
    }
}

impl SignatureVerificationApi for SignatureVerifier {
    fn sign(&self, bytes: &[u8], keypair: &Ed25519KeyPair) -> String {
        sign_hex(bytes, keypair)
    }

    fn verify(&self, bytes: &[u8], signature: &str, public_key: &str) -> bool {
        match verify_hex(bytes, signature, public_key) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Signature rejected");
                false
            }
        }
    }

    fn sign_envelope(&self, envelope: &mut Envelope, identity: &LocalIdentity) {
        let bytes = self.codec.signing_bytes(envelope);
        envelope.signature = sign_hex(&bytes, identity.keypair());
    }

    fn verify_envelope(&self, envelope: &Envelope, public_key: &str) -> Result<(), SignatureError> {
        if !envelope.is_signed() {
            return Err(SignatureError::Unsigned);
        }
        let bytes = self.codec.signing_bytes(envelope);
        verify_hex(&bytes, &envelope.signature, public_key).map_err(|e| {
            warn!(message_id = %envelope.id, from = %envelope.from, error = %e, "Envelope signature invalid");
            e
        })
    }
}
