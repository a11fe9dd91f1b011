//! # Local Identity
//!
//! This node's domain and signing key.

use super::errors::SignatureError;
use shared_crypto::Ed25519KeyPair;
use shared_types::normalize_domain;

/// Domain and Ed25519 key this node signs outbound envelopes with.
#[derive(Debug)]
pub struct LocalIdentity {
    domain: String,
    keypair: Ed25519KeyPair,
}

impl LocalIdentity {
    /// Build from an existing keypair.
    pub fn new(domain: &str, keypair: Ed25519KeyPair) -> Self {
        Self {
            domain: normalize_domain(domain),
            keypair,
        }
    }

    /// Load from a 64-char hex seed.
    pub fn from_seed_hex(domain: &str, seed_hex: &str) -> Result<Self, SignatureError> {
        let keypair = Ed25519KeyPair::from_seed_hex(seed_hex)
            .map_err(|e| SignatureError::InvalidSeed(e.to_string()))?;
        Ok(Self::new(domain, keypair))
    }

    /// Fresh random identity.
    pub fn generate(domain: &str) -> Self {
        Self::new(domain, Ed25519KeyPair::generate())
    }

    /// Normalized domain.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Hex public key peers register for this node.
    pub fn public_key_hex(&self) -> String {
        self.keypair.public_key().to_hex()
    }

    /// Signing keypair.
    pub fn keypair(&self) -> &Ed25519KeyPair {
        &self.keypair
    }
}
