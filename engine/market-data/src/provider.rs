//! External quote provider client
//!
//! Fetches real-time prices from an Alpha-Vantage-shaped JSON API. Provider
//! calls are low frequency and must tolerate rate limiting; any failure is
//! reported as `QuoteProviderUnavailable` and handled by the caller's
//! fallback chain.

use crate::config::MarketDataConfig;
use crate::error::MarketDataError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use tracing::debug;

/// A price snapshot returned by the provider
#[derive(Debug, Clone)]
pub struct ProviderQuote {
    pub symbol: String,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Source of external price data
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<ProviderQuote, MarketDataError>;
}

#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
}

/// HTTP client for the external quote API
pub struct AlphaQuoteClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AlphaQuoteClient {
    pub fn new(config: &MarketDataConfig) -> Result<Self, MarketDataError> {
        let http = reqwest::Client::builder()
            .timeout(config.provider_timeout)
            .build()
            .map_err(MarketDataError::HttpError)?;

        Ok(Self {
            http,
            base_url: config.provider_base_url.clone(),
            api_key: config.provider_api_key.clone(),
        })
    }
}

#[async_trait]
impl QuoteProvider for AlphaQuoteClient {
    async fn fetch_quote(&self, symbol: &str) -> Result<ProviderQuote, MarketDataError> {
        let url = format!(
            "{}/query?function=GLOBAL_QUOTE&symbol={}&apikey={}",
            self.base_url, symbol, self.api_key
        );

        debug!("Fetching quote from provider for {}", symbol);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| MarketDataError::QuoteProviderUnavailable { message: e.to_string() })?;

        let body: GlobalQuoteResponse = response
            .json()
            .await
            .map_err(|e| MarketDataError::QuoteProviderUnavailable { message: e.to_string() })?;

        let quote = body.global_quote.and_then(|q| q.price.map(|p| (q.symbol, p))).ok_or_else(
            || MarketDataError::QuoteProviderUnavailable {
                message: format!("no quote data for {symbol}"),
            },
        )?;

        let (reported_symbol, price_str) = quote;
        let price = Decimal::from_str(price_str.trim()).map_err(|e| {
            MarketDataError::QuoteProviderUnavailable {
                message: format!("unparseable price {price_str:?}: {e}"),
            }
        })?;

        Ok(ProviderQuote {
            symbol: reported_symbol.unwrap_or_else(|| symbol.to_string()),
            price,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_global_quote_payload() {
        let payload = r#"{
            "Global Quote": {
                "01. symbol": "TSLA",
                "05. price": "193.7500",
                "10. change percent": "1.23%"
            }
        }"#;

        let parsed: GlobalQuoteResponse = serde_json::from_str(payload).unwrap();
        let quote = parsed.global_quote.unwrap();
        assert_eq!(quote.symbol.as_deref(), Some("TSLA"));
        assert_eq!(
            Decimal::from_str(quote.price.as_deref().unwrap()).unwrap(),
            Decimal::new(1937500, 4)
        );
    }

    #[test]
    fn test_parse_rate_limited_payload() {
        // Rate-limited responses carry a note instead of a quote
        let payload = r#"{"Note": "Thank you for using our API"}"#;
        let parsed: GlobalQuoteResponse = serde_json::from_str(payload).unwrap();
        assert!(parsed.global_quote.is_none());
    }
}
