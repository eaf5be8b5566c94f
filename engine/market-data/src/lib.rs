//! Market data service - stock price store, quote cache, and provider fallback
//!
//! This crate owns the persisted per-symbol price state (market price, daily
//! open price, availability flag) and the quote lookup chain used by the rest
//! of the system: short-lived cache, database row, external provider, and a
//! deterministic mock as the last resort.

pub mod cache;
pub mod config;
pub mod error;
pub mod provider;
pub mod quote;
pub mod store;
pub mod universe;

pub use cache::QuoteCache;
pub use config::MarketDataConfig;
pub use error::MarketDataError;
pub use provider::{AlphaQuoteClient, ProviderQuote, QuoteProvider};
pub use quote::{MarketDataService, Quote, QuoteSource};
pub use store::{Stock, StockStore};

// Result type alias
pub type Result<T> = std::result::Result<T, MarketDataError>;
