//! Configuration for the market data service

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for the market data service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataConfig {
    /// TTL for cached quotes
    pub quote_cache_ttl: Duration,

    /// A database row younger than this is served without hitting the provider
    pub store_freshness: Duration,

    /// Base URL of the external quote provider
    pub provider_base_url: String,

    /// API key for the external quote provider
    pub provider_api_key: String,

    /// Request timeout for provider calls
    pub provider_timeout: Duration,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            quote_cache_ttl: Duration::from_secs(1),
            store_freshness: Duration::from_secs(15 * 60),
            provider_base_url: "https://www.alphavantage.co".to_string(),
            provider_api_key: "demo".to_string(),
            provider_timeout: Duration::from_secs(10),
        }
    }
}
