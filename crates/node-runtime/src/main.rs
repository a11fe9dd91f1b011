//! # olg-node
//!
//! Open Learn Grid federation node.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file, then environment)
//! 2. Initialize logging and metrics
//! 3. Validate configuration (production rejects unsafe settings)
//! 4. Build subsystems and register configured peers
//! 5. Serve until Ctrl-C

use anyhow::{Context, Result};
use node_runtime::{FederationContainer, NodeConfig, NodeRuntime};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::load().context("Failed to load configuration")?;
    olg_telemetry::init_telemetry(&config.telemetry).context("Failed to initialize telemetry")?;

    info!("===========================================");
    info!("  Open Learn Grid Node v{}", node_runtime::VERSION);
    info!("  Environment: {}", config.environment);
    info!("===========================================");

    if let Err(e) = config.validate() {
        error!("{}", e);
        return Err(e).context("Configuration rejected");
    }

    let container = FederationContainer::new(config).context("Failed to build node")?;
    let runtime = Arc::new(NodeRuntime::new(container));
    runtime.start().await?;

    let mut server = {
        let runtime = Arc::clone(&runtime);
        tokio::spawn(async move { runtime.serve().await })
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            info!("Received Ctrl-C");
        }
        joined = &mut server => {
            runtime.shutdown();
            return joined.context("Server task panicked")?;
        }
    }

    runtime.shutdown();
    server.await.context("Server task panicked")??;
    info!("Shutdown complete");
    Ok(())
}
