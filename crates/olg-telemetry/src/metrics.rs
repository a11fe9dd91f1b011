//! Prometheus metrics for federation traffic.
//!
//! Names follow `olg_federation_<metric>_<unit>`. Counters only: the
//! runtime feeds them from bus events, so they count what happened and
//! never need to be read back.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Registry exported at `GET /metrics`.
    pub static ref REGISTRY: Registry = Registry::new();

    /// Message status transitions, by new status.
    pub static ref MESSAGES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("olg_federation_messages_total", "Federation message status transitions"),
        &["status"]
    ).expect("metric creation failed");

    /// Finished sync sessions, by outcome.
    pub static ref SYNC_SESSIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("olg_federation_sync_sessions_total", "Finished sync sessions"),
        &["status"]
    ).expect("metric creation failed");

    /// Records applied locally or accepted by peers.
    pub static ref RECORDS_SYNCED_TOTAL: IntCounter = IntCounter::new(
        "olg_federation_records_synced_total",
        "Records synchronized across all sessions"
    ).expect("metric creation failed");

    /// Refused inbound messages, by reason code.
    pub static ref INBOUND_REJECTED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("olg_federation_inbound_rejected_total", "Inbound federation messages refused"),
        &["reason"]
    ).expect("metric creation failed");
}

/// Register every metric with [`REGISTRY`]. Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(MESSAGES_TOTAL.clone()),
        Box::new(SYNC_SESSIONS_TOTAL.clone()),
        Box::new(RECORDS_SYNCED_TOTAL.clone()),
        Box::new(INBOUND_REJECTED_TOTAL.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// A message moved to `status`.
pub fn record_message_status(status: &str) {
    MESSAGES_TOTAL.with_label_values(&[status]).inc();
}

/// A sync session finished.
pub fn record_sync_session(status: &str, records_synced: u64) {
    SYNC_SESSIONS_TOTAL.with_label_values(&[status]).inc();
    RECORDS_SYNCED_TOTAL.inc_by(records_synced);
}

/// An inbound message was refused.
pub fn record_inbound_rejected(reason: &str) {
    INBOUND_REJECTED_TOTAL.with_label_values(&[reason]).inc();
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
