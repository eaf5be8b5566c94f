//! TradeX Production Service
//!
//! This is the main entry point for the TradeX simulated trading platform.
//! It initializes all components, starts the price simulator, serves the
//! REST gateway, and provides graceful shutdown handling.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

use tradex_service::{load_configuration, logging, ServiceState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Load configuration, then bring up logging with its settings
    let config = load_configuration().context("Failed to load configuration")?;
    logging::initialize_logging_with_config(&config.logging)?;

    info!("Starting TradeX Service v{}", env!("CARGO_PKG_VERSION"));

    // Create service state
    let service_state = Arc::new(ServiceState::new(config).await?);
    info!("Service state initialized");

    // Start the price simulator in a separate task
    info!("Starting price simulator...");
    let simulator_handle = service_state.start_price_simulator();

    // Start the gateway in a separate task
    info!("Starting TradeGateway...");
    let gateway_handle = {
        let state = service_state.clone();
        tokio::spawn(async move {
            if let Err(e) = state.run_gateway().await {
                error!("TradeGateway failed: {}", e);
            }
        })
    };

    // Wait for shutdown signal
    info!("TradeX Service is running. Press Ctrl+C to shutdown gracefully.");
    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl+C signal")?;

    // Graceful shutdown
    info!("Shutdown signal received. Initiating graceful shutdown...");
    service_state.initiate_shutdown();

    let shutdown_timeout =
        Duration::from_secs(service_state.config.service.shutdown_timeout_secs);
    for (name, handle) in [("price simulator", simulator_handle), ("gateway", gateway_handle)] {
        match timeout(shutdown_timeout, handle).await {
            Ok(Ok(())) => info!("{} stopped gracefully", name),
            Ok(Err(e)) => error!("{} task failed: {}", name, e),
            Err(_) => warn!("{} did not stop within timeout, forcing shutdown", name),
        }
    }

    info!("TradeX Service shutdown complete");
    Ok(())
}
