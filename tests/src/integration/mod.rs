//! # Integration Scenarios
//!
//! Every scenario runs two or more complete nodes over the in-process
//! transport from [`crate::harness`].

mod delivery_flows;
mod inbound_security;
mod registry_flows;
mod sync_flows;
