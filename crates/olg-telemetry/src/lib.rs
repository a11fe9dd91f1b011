//! # OLG Telemetry
//!
//! Structured logging and Prometheus metrics for Open Learn Grid nodes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use olg_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OLG_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `OLG_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `OLG_SERVICE_NAME` | `olg-node` | Service name in logs |

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};
pub use metrics::{
    encode_metrics, record_inbound_rejected, record_message_status, record_sync_session,
    register_metrics, INBOUND_REJECTED_TOTAL, MESSAGES_TOTAL, RECORDS_SYNCED_TOTAL,
    SYNC_SESSIONS_TOTAL,
};

use thiserror::Error;

/// Telemetry initialization errors.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The global subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// A metric could not be registered or encoded.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Invalid telemetry settings.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install logging and register metrics.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    if config.metrics_enabled {
        register_metrics()?;
    }
    init_logging(config)
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
