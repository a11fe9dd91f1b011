//! # Open Learn Grid Test Suite
//!
//! Cross-subsystem federation scenarios.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # in-process federation of full nodes
//! └── integration/
//!     ├── sync_flows.rs       # full, incremental and bilateral sessions
//!     ├── delivery_flows.rs   # retries, backoff, ordering
//!     ├── inbound_security.rs # credentials, signatures, replay
//!     └── registry_flows.rs   # lifecycle, duplicates, audit trail
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p olg-tests
//! cargo test -p olg-tests integration::sync_flows
//! ```

#![allow(dead_code)]

pub mod harness;
pub mod integration;
