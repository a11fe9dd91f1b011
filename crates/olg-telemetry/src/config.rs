//! Telemetry configuration.

use serde::{Deserialize, Serialize};
use std::env;

/// Logging and metrics settings.
///
/// Read from the node's `[telemetry]` section, then overridden by
/// environment variables in [`TelemetryConfig::apply_env`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name attached to every log line.
    pub service_name: String,

    /// `EnvFilter` directive (trace, debug, info, warn, error, or per-target).
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json_logs: bool,

    /// Serve `GET /metrics`.
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "olg-node".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
        }
    }
}

impl TelemetryConfig {
    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Apply environment overrides.
    ///
    /// # Environment Variables
    ///
    /// - `OLG_LOG_LEVEL` or `RUST_LOG`: log filter
    /// - `OLG_JSON_LOGS`: `true`/`1` for JSON output; defaults to on
    ///   inside containers
    /// - `OLG_SERVICE_NAME`: service name
    pub fn apply_env(&mut self) {
        if let Ok(level) = env::var("OLG_LOG_LEVEL").or_else(|_| env::var("RUST_LOG")) {
            self.log_level = level;
        }

        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();
        match env::var("OLG_JSON_LOGS") {
            Ok(v) => self.json_logs = parse_flag(&v),
            Err(_) if is_container => self.json_logs = true,
            Err(_) => {}
        }

        if let Ok(name) = env::var("OLG_SERVICE_NAME") {
            self.service_name = name;
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
