//! # Ed25519 Operations
//!
//! Hex-in, hex-out wrappers over `shared-crypto`.

use super::errors::SignatureError;
use shared_crypto::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

/// Sign `bytes` and return the hex signature.
pub fn sign_hex(bytes: &[u8], keypair: &Ed25519KeyPair) -> String {
    keypair.sign(bytes).to_hex()
}

/// Check a hex signature against a hex public key.
pub fn verify_hex(bytes: &[u8], signature: &str, public_key: &str) -> Result<(), SignatureError> {
    let key = Ed25519PublicKey::from_hex(public_key)
        .map_err(|e| SignatureError::InvalidPublicKey(e.to_string()))?;
    let signature = Ed25519Signature::from_hex(signature)
        .map_err(|e| SignatureError::InvalidSignatureFormat(e.to_string()))?;
    key.verify(bytes, &signature)
        .map_err(|_| SignatureError::VerificationFailed)
}
