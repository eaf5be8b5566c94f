//! TradeX Production Service Library
//!
//! This library provides the core functionality for the TradeX production
//! service, including configuration management, component initialization, and
//! graceful shutdown handling.

use anyhow::{Context, Result};

pub mod config;
pub mod logging;
pub mod service;

pub use config::ServiceConfig;
pub use logging::initialize_logging_with_config;
pub use service::ServiceState;

/// Load configuration from files and environment variables
pub fn load_configuration() -> Result<ServiceConfig> {
    config::load_config().context("Failed to load service configuration")
}
