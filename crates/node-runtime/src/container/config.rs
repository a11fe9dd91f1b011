//! # Node Configuration
//!
//! One [`NodeConfig`] is assembled at start-up and passed by reference.
//!
//! ## Sources, lowest precedence first
//!
//! 1. Built-in defaults
//! 2. TOML file: `OLG_CONFIG`, or `config/<OLG_ENV>.toml` (`local` by default)
//! 3. Environment: `OLG_SIGNING_SEED`, `OLG_LISTEN_ADDR`, `OLG_DOMAIN`,
//!    `OLG_LOG_LEVEL`
//!
//! ## Security Requirements
//!
//! - The signing seed MUST be set, and MUST NOT be all zeros, in production
//! - Production peers and this node's public URL MUST be https

use olg_01_instance_registry::RegistryConfig;
use olg_02_envelope_codec::CodecConfig;
use olg_04_delivery_queue::DeliveryConfig;
use olg_05_sync_coordinator::SyncConfig;
use olg_telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Developer machine.
    #[default]
    Local,
    /// Shared test deployment.
    Staging,
    /// Live federation.
    Production,
}

impl Environment {
    /// Config file stem for this environment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "dev" | "development" => Ok(Environment::Local),
            "staging" | "test" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::InvalidEnv {
                var: "OLG_ENV",
                reason: format!("unknown environment '{other}'"),
            }),
        }
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Deployment environment.
    pub environment: Environment,
    /// This node's federation identity.
    pub identity: IdentityConfig,
    /// HTTP server.
    pub server: ServerConfig,
    /// Instance registry.
    pub registry: RegistryConfig,
    /// Envelope codec.
    pub codec: CodecConfig,
    /// Delivery queue.
    pub delivery: DeliveryConfig,
    /// Sync coordinator and inbound processor.
    pub sync: SyncConfig,
    /// Logging and metrics.
    pub telemetry: TelemetryConfig,
    /// Peers registered at start-up.
    pub peers: Vec<PeerConfig>,
}

/// This node's domain and signing key.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Domain peers know this node by.
    pub domain: String,
    /// Ed25519 seed, 64 hex chars. An ephemeral key is generated when
    /// empty outside production.
    pub signing_seed: String,
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("domain", &self.domain)
            .field("signing_seed", &if self.signing_seed.is_empty() { "<unset>" } else { "<redacted>" })
            .finish()
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind.
    pub listen_addr: String,
    /// Base URL peers use to reach this node.
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            public_url: "http://localhost:8080".to_string(),
        }
    }
}

/// A peer registered at start-up.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    /// Display name.
    pub name: String,
    /// Peer domain.
    pub domain: String,
    /// Base URL of the peer's API.
    pub api_url: String,
    /// Peer's Ed25519 public key, hex.
    pub public_key: String,
    /// Free text.
    pub description: String,
    /// Credential this node accepts from the peer. Generated when unset.
    pub inbound_api_key: Option<String>,
    /// Credential the peer issued to this node.
    pub outbound_api_key: Option<String>,
    /// Activate the peer immediately.
    pub active: bool,
    /// Mark the peer trusted.
    pub trusted: bool,
}

impl fmt::Debug for PeerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerConfig")
            .field("name", &self.name)
            .field("domain", &self.domain)
            .field("api_url", &self.api_url)
            .field("active", &self.active)
            .field("trusted", &self.trusted)
            .finish_non_exhaustive()
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`NodeConfig`].
    #[error("Failed to parse config file {path}: {reason}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// An environment override could not be applied.
    #[error("Invalid value for {var}: {reason}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// No domain configured.
    #[error("identity.domain is not set (OLG_DOMAIN)")]
    MissingDomain,

    /// Seed is not 32 bytes of hex.
    #[error("identity.signing_seed must be 64 hex characters")]
    InvalidSigningSeed,

    /// Seed missing or zero in production.
    #[error(
        "SECURITY VIOLATION: signing seed is unset or zero. \
         Set OLG_SIGNING_SEED or identity.signing_seed."
    )]
    InsecureSigningSeed,

    /// Plain-http URL in production.
    #[error("SECURITY VIOLATION: {what} must use https, got '{url}'")]
    InsecureUrl {
        /// Which setting.
        what: String,
        /// The offending URL.
        url: String,
    },
}

impl NodeConfig {
    /// Load from the configured file, then apply environment overrides.
    ///
    /// A missing default file is not an error; an explicit `OLG_CONFIG`
    /// that cannot be read is.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|var| std::env::var(var).ok())
    }

    /// [`NodeConfig::load`] with an injectable environment.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match env("OLG_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => {
                let environment = env("OLG_ENV")
                    .map(|e| e.parse::<Environment>())
                    .transpose()?
                    .unwrap_or_default();
                let path = PathBuf::from(format!("config/{environment}.toml"));
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self {
                        environment,
                        ..Self::default()
                    }
                }
            }
        };
        config.apply_overrides(env)?;
        Ok(config)
    }

    /// Parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|reason| ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    /// Apply environment overrides.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(seed) = env("OLG_SIGNING_SEED") {
            self.identity.signing_seed = seed.trim().to_string();
        }
        if let Some(addr) = env("OLG_LISTEN_ADDR") {
            addr.parse::<std::net::SocketAddr>()
                .map_err(|e| ConfigError::InvalidEnv {
                    var: "OLG_LISTEN_ADDR",
                    reason: e.to_string(),
                })?;
            self.server.listen_addr = addr;
        }
        if let Some(domain) = env("OLG_DOMAIN") {
            self.identity.domain = domain.trim().to_string();
        }
        if let Some(level) = env("OLG_LOG_LEVEL") {
            self.telemetry.log_level = level;
        }
        if let Some(json) = env("OLG_JSON_LOGS") {
            self.telemetry.json_logs = matches!(json.trim().to_lowercase().as_str(), "true" | "1");
        }
        Ok(())
    }

    /// Checks that apply in every environment.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.domain.trim().is_empty() {
            return Err(ConfigError::MissingDomain);
        }
        if !self.identity.signing_seed.is_empty() {
            let valid = hex::decode(&self.identity.signing_seed).is_ok_and(|b| b.len() == 32);
            if !valid {
                return Err(ConfigError::InvalidSigningSeed);
            }
        }
        if self.environment == Environment::Production {
            self.validate_for_production()?;
        }
        Ok(())
    }

    /// Validate configuration for production readiness.
    ///
    /// # Returns
    ///
    /// Returns `Err` if:
    /// - the signing seed is unset or all zeros
    /// - this node's public URL, or any peer's API URL, is not https
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        let seed = hex::decode(&self.identity.signing_seed).unwrap_or_default();
        if seed.is_empty() || seed.iter().all(|b| *b == 0) {
            return Err(ConfigError::InsecureSigningSeed);
        }

        let https = |url: &str| url.trim().to_lowercase().starts_with("https://");
        if !https(&self.server.public_url) {
            return Err(ConfigError::InsecureUrl {
                what: "server.public_url".to_string(),
                url: self.server.public_url.clone(),
            });
        }
        if let Some(peer) = self.peers.iter().find(|p| !https(&p.api_url)) {
            return Err(ConfigError::InsecureUrl {
                what: format!("api_url of peer '{}'", peer.domain),
                url: peer.api_url.clone(),
            });
        }
        Ok(())
    }

    /// Registry settings, tightened to https-only in production.
    pub fn effective_registry(&self) -> RegistryConfig {
        if self.environment == Environment::Production {
            RegistryConfig {
                require_https: true,
                ..self.registry.clone()
            }
        } else {
            self.registry.clone()
        }
    }
}
