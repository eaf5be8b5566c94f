//! Short-lived in-process quote cache
//!
//! Keyed by symbol with a fixed TTL. The cache tolerates staleness up to the
//! TTL; callers that need a fresh price go through the provider instead.

use crate::quote::Quote;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Quote cache with per-entry expiry
#[derive(Debug)]
pub struct QuoteCache {
    entries: DashMap<String, (Quote, Instant)>,
    ttl: Duration,
}

impl QuoteCache {
    /// Create a new cache with the given TTL
    pub fn new(ttl: Duration) -> Self {
        Self { entries: DashMap::new(), ttl }
    }

    /// Get a cached quote if it has not expired
    pub fn get(&self, symbol: &str) -> Option<Quote> {
        let entry = self.entries.get(symbol)?;
        let (quote, inserted_at) = entry.value();
        if inserted_at.elapsed() > self.ttl {
            drop(entry);
            self.entries.remove(symbol);
            debug!("Cache entry expired for {}", symbol);
            return None;
        }
        debug!("Cache hit for {}", symbol);
        Some(quote.clone())
    }

    /// Store a quote
    pub fn insert(&self, quote: Quote) {
        self.entries.insert(quote.symbol.clone(), (quote, Instant::now()));
    }

    /// Drop a cached quote (call when the underlying row changes)
    pub fn invalidate(&self, symbol: &str) {
        self.entries.remove(symbol);
    }

    /// Number of live entries, expired ones included until their next lookup
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::QuoteSource;
    use rust_decimal::Decimal;

    fn quote(symbol: &str) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            price: Decimal::new(10000, 2),
            open_price: None,
            open_price_time: None,
            is_available: true,
            source: QuoteSource::Store,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let cache = QuoteCache::new(Duration::from_secs(60));
        cache.insert(quote("TSLA"));

        let hit = cache.get("TSLA").unwrap();
        assert_eq!(hit.symbol, "TSLA");
        assert!(cache.get("AAPL").is_none());
    }

    #[test]
    fn test_expiry() {
        let cache = QuoteCache::new(Duration::from_millis(0));
        cache.insert(quote("TSLA"));
        std::thread::sleep(Duration::from_millis(5));

        assert!(cache.get("TSLA").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate() {
        let cache = QuoteCache::new(Duration::from_secs(60));
        cache.insert(quote("TSLA"));
        cache.invalidate("TSLA");

        assert!(cache.get("TSLA").is_none());
    }
}
