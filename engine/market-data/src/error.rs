//! Error types for the market data service

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("Quote provider unavailable: {message}")]
    QuoteProviderUnavailable { message: String },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}
