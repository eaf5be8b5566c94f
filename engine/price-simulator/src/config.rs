//! Configuration for the price simulator

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Price simulator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Interval between ticks
    pub tick_interval: Duration,

    /// Largest absolute per-tick price move
    pub max_delta: Decimal,

    /// Prices never drop below this floor
    pub price_floor: Decimal,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(10),
            max_delta: Decimal::from(30),
            price_floor: Decimal::ONE,
        }
    }
}
