//! Quote lookup with layered fallback
//!
//! Lookup order: short-lived cache, stocks row, external provider, synthesized
//! mock. The chain never raises to the caller; `get_quote` always returns a
//! usable quote object, possibly mock data, so demo traffic keeps flowing when
//! the provider is down.

use crate::cache::QuoteCache;
use crate::config::MarketDataConfig;
use crate::error::MarketDataError;
use crate::provider::QuoteProvider;
use crate::store::{Stock, StockStore};
use crate::universe;
use crate::Result;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Where a quote came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSource {
    Store,
    Provider,
    Mock,
}

/// A price snapshot for a symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: Decimal,
    pub open_price: Option<Decimal>,
    pub open_price_time: Option<DateTime<Utc>>,
    pub is_available: bool,
    pub source: QuoteSource,
}

impl Quote {
    fn from_stock(stock: &Stock, source: QuoteSource) -> Self {
        Self {
            symbol: stock.symbol.clone(),
            price: stock.market_price,
            open_price: stock.open_price,
            open_price_time: stock.open_price_time,
            is_available: stock.is_available,
            source,
        }
    }
}

/// MarketDataService resolves quotes through the fallback chain
pub struct MarketDataService {
    store: StockStore,
    cache: Arc<QuoteCache>,
    provider: Arc<dyn QuoteProvider>,
    config: MarketDataConfig,
}

impl MarketDataService {
    pub fn new(
        store: StockStore,
        cache: Arc<QuoteCache>,
        provider: Arc<dyn QuoteProvider>,
        config: MarketDataConfig,
    ) -> Self {
        Self { store, cache, provider, config }
    }

    pub fn store(&self) -> &StockStore {
        &self.store
    }

    /// Get a quote for a symbol. Never fails: the chain bottoms out in
    /// deterministic mock data.
    pub async fn get_quote(&self, symbol: &str) -> Quote {
        if let Some(quote) = self.cache.get(symbol) {
            return quote;
        }

        match self.quote_from_store_or_provider(symbol).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!("Quote lookup failed for {}, serving mock data: {}", symbol, e);
                self.mock_quote(symbol)
            }
        }
    }

    async fn quote_from_store_or_provider(&self, symbol: &str) -> Result<Quote> {
        if let Some(stock) = self.store.get_by_symbol(symbol).await? {
            let quote = Quote::from_stock(&stock, QuoteSource::Store);
            self.cache.insert(quote.clone());

            let age = Utc::now().signed_duration_since(stock.last_updated);
            let fresh = age
                .to_std()
                .map(|age| age < self.config.store_freshness)
                .unwrap_or(true);
            if fresh {
                return Ok(quote);
            }

            // Stored price is stale; a provider failure falls back to it
            match self.fetch_and_record(symbol).await {
                Ok(fresh_quote) => Ok(fresh_quote),
                Err(e) => {
                    debug!("Provider refresh failed for {}, using stored price: {}", symbol, e);
                    Ok(quote)
                }
            }
        } else {
            match self.fetch_and_record(symbol).await {
                Ok(quote) => Ok(quote),
                Err(e) => {
                    warn!("Provider fetch failed for unknown symbol {}: {}", symbol, e);
                    Ok(self.mock_quote(symbol))
                }
            }
        }
    }

    /// Force a provider fetch for a symbol, updating the stored row.
    ///
    /// Unlike `get_quote` this propagates provider errors so callers can
    /// decide whether the refresh was best-effort.
    pub async fn refresh_symbol(&self, symbol: &str) -> Result<Quote> {
        self.fetch_and_record(symbol).await
    }

    async fn fetch_and_record(&self, symbol: &str) -> Result<Quote> {
        let provider_quote = self.provider.fetch_quote(symbol).await?;
        let stock = self.store.record_price(symbol, provider_quote.price).await?;

        let quote = Quote::from_stock(&stock, QuoteSource::Provider);
        self.cache.invalidate(symbol);
        self.cache.insert(quote.clone());

        Ok(quote)
    }

    /// Synthesize a deterministic quote seeded from the symbol name.
    ///
    /// Repeated calls for the same symbol produce the same price, which keeps
    /// demo data stable while the provider is unreachable.
    pub fn mock_quote(&self, symbol: &str) -> Quote {
        let mut rng = StdRng::seed_from_u64(symbol_seed(symbol));

        let base = universe::base_price(symbol).unwrap_or_else(|| {
            let offset: i64 = rng.gen_range(1..900);
            Decimal::from(100) + Decimal::from(offset)
        });

        // Variation of +/- 2.5% in basis points keeps the arithmetic exact
        let variation_bp: i64 = rng.gen_range(-250..=250);
        let price = (base * (Decimal::from(10_000 + variation_bp)) / Decimal::from(10_000))
            .round_dp(2);

        let now = Utc::now();
        Quote {
            symbol: symbol.to_string(),
            price,
            open_price: Some(price),
            open_price_time: Some(now),
            is_available: true,
            source: QuoteSource::Mock,
        }
    }
}

/// FNV-1a over the symbol bytes; stable across runs and platforms
fn symbol_seed(symbol: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in symbol.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_seed_is_stable() {
        assert_eq!(symbol_seed("TSLA"), symbol_seed("TSLA"));
        assert_ne!(symbol_seed("TSLA"), symbol_seed("AAPL"));
    }

    #[tokio::test]
    async fn test_mock_quote_is_deterministic() {
        let service = mock_only_service();
        let first = service.mock_quote("TSLA");
        let second = service.mock_quote("TSLA");

        assert_eq!(first.price, second.price);
        assert_eq!(first.source, QuoteSource::Mock);
        assert!(first.is_available);
    }

    #[tokio::test]
    async fn test_mock_quote_stays_near_base_price() {
        let service = mock_only_service();
        let quote = service.mock_quote("TSLA");

        let base = universe::base_price("TSLA").unwrap();
        let lower = base * Decimal::new(975, 3);
        let upper = base * Decimal::new(1025, 3);
        assert!(quote.price >= lower && quote.price <= upper);
    }

    #[tokio::test]
    async fn test_mock_quote_unknown_symbol() {
        let service = mock_only_service();
        let quote = service.mock_quote("ZZZZ");

        assert!(quote.price >= Decimal::from(90));
        assert_eq!(quote.open_price, Some(quote.price));
    }

    struct NeverProvider;

    #[async_trait::async_trait]
    impl QuoteProvider for NeverProvider {
        async fn fetch_quote(
            &self,
            symbol: &str,
        ) -> std::result::Result<crate::provider::ProviderQuote, MarketDataError> {
            Err(MarketDataError::QuoteProviderUnavailable { message: symbol.to_string() })
        }
    }

    fn mock_only_service() -> MarketDataService {
        let config = MarketDataConfig::default();
        let pool = sqlx::PgPool::connect_lazy("postgresql://localhost/tradex_test")
            .expect("lazy pool");
        MarketDataService::new(
            StockStore::new(pool),
            Arc::new(QuoteCache::new(config.quote_cache_ttl)),
            Arc::new(NeverProvider),
            config,
        )
    }
}
