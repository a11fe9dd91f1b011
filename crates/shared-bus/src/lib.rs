//! # Shared Bus - Federation Event Bus
//!
//! In-process publish/subscribe for federation domain events.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Registry /   │    publish()       │ Audit trail /│
//! │ Queue / Sync │ ──────┐            │ Metrics      │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! Publishing never blocks on subscribers: a slow subscriber lags and
//! loses the oldest events instead of stalling a delivery lane.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{EventFilter, EventTopic, FederationEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
