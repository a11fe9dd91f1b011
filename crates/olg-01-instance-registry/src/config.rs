//! # Registry Configuration

use serde::{Deserialize, Serialize};

/// Instance registry configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Reject plain `http://` API URLs.
    pub require_https: bool,

    /// Random bytes in a generated API credential (hex-encoded, so the
    /// credential is twice as long).
    pub api_key_bytes: usize,

    /// Re-read attempts for idempotent updates (`touch`, `mark_trusted`)
    /// that lose an optimistic version race.
    pub max_update_attempts: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            require_https: false,
            api_key_bytes: 32,
            max_update_attempts: 3,
        }
    }
}

impl RegistryConfig {
    /// Production settings: https only.
    pub fn production() -> Self {
        Self {
            require_https: true,
            ..Self::default()
        }
    }
}
