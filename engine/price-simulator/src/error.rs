//! Error types for the price simulator

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Market data error: {0}")]
    MarketData(#[from] market_data::MarketDataError),
}
