//! # Node Runtime
//!
//! ## Startup Sequence
//!
//! 1. Register configured peers
//! 2. Spawn bus handlers (audit trail, metrics)
//! 3. Spawn the sync scheduler when `[sync] interval_secs` is set
//! 4. Bind the listener and serve the federation API
//!
//! Shutdown is signalled through a `watch` channel: handlers and the
//! scheduler stop, and the server finishes in-flight requests before
//! returning. Sessions already running are left to finish.

use crate::api::{self, AppState};
use crate::container::FederationContainer;
use crate::handlers::{AuditTrailHandler, MetricsHandler};
use anyhow::{Context, Result};
use olg_01_instance_registry::RegistryApi;
use olg_05_sync_coordinator::{SyncCoordinatorApi, SyncError};
use shared_types::{InstanceStatus, SyncType};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// One running federation node.
pub struct NodeRuntime {
    container: Arc<FederationContainer>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl NodeRuntime {
    /// Wrap a built container.
    pub fn new(container: FederationContainer) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            container: Arc::new(container),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Shared subsystems.
    pub fn container(&self) -> Arc<FederationContainer> {
        Arc::clone(&self.container)
    }

    /// Register peers, start the bus handlers and the sync scheduler.
    pub async fn start(&self) -> Result<()> {
        let peers = self
            .container
            .bootstrap_peers()
            .await
            .context("Failed to register configured peers")?;
        info!(bootstrapped = peers.len(), "Peer registry ready");

        self.spawn_handlers();
        if let Some(period) = self.container.config.sync.schedule_interval() {
            self.spawn_scheduler(period);
        }
        Ok(())
    }

    /// Start an incremental sync with every active peer once per `period`,
    /// skipping peers that already have a session running.
    fn spawn_scheduler(&self, period: Duration) {
        let container = Arc::clone(&self.container);
        let mut shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticks.tick() => sync_active_peers(&container).await,
                    _ = shutdown.changed() => {
                        info!("Sync scheduler received shutdown signal");
                        break;
                    }
                }
            }
        });
        info!(interval_secs = period.as_secs(), "Sync scheduler started");
    }

    fn spawn_handlers(&self) {
        let container = &self.container;

        let audit = AuditTrailHandler::new(&container.bus, container.audit_log.clone(), container.time.clone());
        let mut audit_shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = audit.run() => {}
                _ = audit_shutdown.changed() => {
                    info!("Audit trail handler received shutdown signal");
                }
            }
        });

        if container.config.telemetry.metrics_enabled {
            let metrics = MetricsHandler::new(&container.bus);
            let mut metrics_shutdown = self.shutdown_rx.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = metrics.run() => {}
                    _ = metrics_shutdown.changed() => {
                        info!("Metrics handler received shutdown signal");
                    }
                }
            });
        }

        info!("Event handlers started");
    }

    /// Federation API router for this node.
    pub fn router(&self) -> axum::Router {
        let state = AppState {
            inbound: self.container.inbound.clone(),
            identity: self.container.identity.clone(),
        };
        api::router(state, self.container.config.codec.max_envelope_bytes)
    }

    /// Serve the API until [`NodeRuntime::shutdown`] is called.
    pub async fn serve(&self) -> Result<()> {
        let addr: SocketAddr = self
            .container
            .config
            .server
            .listen_addr
            .parse()
            .with_context(|| format!("Invalid listen address '{}'", self.container.config.server.listen_addr))?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        self.serve_on(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_on(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr().context("Listener has no local address")?;
        info!(
            addr = %local_addr,
            domain = %self.container.identity.domain(),
            public_url = %self.container.config.server.public_url,
            "Federation API listening"
        );

        let mut shutdown = self.shutdown_rx.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await
            .context("Federation API server failed")
    }

    /// Signal handlers and the server to stop.
    pub fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
    }
}

async fn sync_active_peers(container: &FederationContainer) {
    let peers = match container.registry.list(Some(InstanceStatus::Active)).await {
        Ok(peers) => peers,
        Err(e) => {
            error!(error = %e, "Scheduled sync could not list peers");
            return;
        }
    };

    let mut started = 0usize;
    for peer in peers {
        if container.coordinator.is_running(peer.id) {
            continue;
        }
        match container.coordinator.start_sync(peer.id, SyncType::Incremental).await {
            Ok(handle) => {
                started += 1;
                debug!(peer = %peer.domain, session_id = %handle.session_id(), "Scheduled sync started");
            }
            Err(e @ (SyncError::AlreadyRunning { .. } | SyncError::PeerNotTrusted(_) | SyncError::MissingCredential(_))) => {
                debug!(peer = %peer.domain, reason = %e, "Scheduled sync skipped");
            }
            Err(e) => warn!(peer = %peer.domain, error = %e, "Scheduled sync failed to start"),
        }
    }
    debug!(started, "Scheduled sync round finished");
}
