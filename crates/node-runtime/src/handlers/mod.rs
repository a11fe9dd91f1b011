//! # Event Handlers
//!
//! Bus subscribers spawned by the runtime.
//!
//! | Handler | Topics | Effect |
//! |---------|--------|--------|
//! | [`AuditTrailHandler`] | Delivery, Registry, Sync | appends [`shared_types::AuditRecord`]s |
//! | [`MetricsHandler`] | all | feeds the Prometheus counters |

mod audit;
mod metrics;

pub use audit::{audit_record, AuditTrailHandler};
pub use metrics::{record_event, MetricsHandler};
