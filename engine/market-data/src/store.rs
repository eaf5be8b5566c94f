//! Persisted per-symbol price state

use crate::universe;
use crate::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Stock represents one tradable symbol and its price state
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Stock {
    pub stock_id: i64,
    pub symbol: String,
    pub company_name: String,
    pub sector: Option<String>,
    pub market_price: Decimal,
    pub open_price: Option<Decimal>,
    pub open_price_time: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
    pub is_available: bool,
}

impl Stock {
    /// Percentage change vs the daily open price, when one is recorded
    pub fn change_percent(&self) -> Option<Decimal> {
        let open = self.open_price?;
        if open <= Decimal::ZERO {
            return None;
        }
        Some((self.market_price - open) / open * Decimal::from(100))
    }

    /// Whether the recorded open price belongs to the current UTC calendar day
    pub fn has_open_price_for(&self, now: DateTime<Utc>) -> bool {
        matches!(self.open_price_time, Some(t) if t.date_naive() == now.date_naive())
            && self.open_price.is_some()
    }
}

/// StockStore provides access to the stocks table
#[derive(Debug, Clone)]
pub struct StockStore {
    pool: PgPool,
}

impl StockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a stock by its id
    pub async fn get_by_id(&self, stock_id: i64) -> Result<Option<Stock>> {
        let stock = sqlx::query_as::<_, Stock>("SELECT * FROM stocks WHERE stock_id = $1")
            .bind(stock_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(stock)
    }

    /// Get a stock by its symbol
    pub async fn get_by_symbol(&self, symbol: &str) -> Result<Option<Stock>> {
        let stock = sqlx::query_as::<_, Stock>("SELECT * FROM stocks WHERE symbol = $1")
            .bind(symbol)
            .fetch_optional(&self.pool)
            .await?;

        Ok(stock)
    }

    /// List all stocks ordered by id
    pub async fn list_all(&self) -> Result<Vec<Stock>> {
        let stocks = sqlx::query_as::<_, Stock>("SELECT * FROM stocks ORDER BY stock_id")
            .fetch_all(&self.pool)
            .await?;

        Ok(stocks)
    }

    /// List one page of stocks, optionally filtered by sector
    pub async fn list_page(
        &self,
        page: i64,
        page_size: i64,
        sector: Option<&str>,
    ) -> Result<(Vec<Stock>, i64)> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let offset = (page - 1) * page_size;

        let (stocks, total) = match sector {
            Some(sector) => {
                let stocks = sqlx::query_as::<_, Stock>(
                    "SELECT * FROM stocks WHERE sector = $1 ORDER BY stock_id LIMIT $2 OFFSET $3",
                )
                .bind(sector)
                .bind(page_size)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

                let total: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM stocks WHERE sector = $1")
                        .bind(sector)
                        .fetch_one(&self.pool)
                        .await?;

                (stocks, total)
            }
            None => {
                let stocks = sqlx::query_as::<_, Stock>(
                    "SELECT * FROM stocks ORDER BY stock_id LIMIT $1 OFFSET $2",
                )
                .bind(page_size)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

                let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stocks")
                    .fetch_one(&self.pool)
                    .await?;

                (stocks, total)
            }
        };

        Ok((stocks, total))
    }

    /// Total number of stocks
    pub async fn count(&self) -> Result<i64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stocks").fetch_one(&self.pool).await?;

        Ok(total)
    }

    /// Record a price observed from the external provider.
    ///
    /// Updates the row (creating it for an unknown symbol) and resets the
    /// daily open price if this is the first update of the UTC calendar day.
    pub async fn record_price(&self, symbol: &str, price: Decimal) -> Result<Stock> {
        let now = Utc::now();

        if let Some(stock) = self.get_by_symbol(symbol).await? {
            let (open_price, open_price_time) = if stock.has_open_price_for(now) {
                (stock.open_price, stock.open_price_time)
            } else {
                (Some(price), Some(now))
            };

            sqlx::query(
                "UPDATE stocks SET market_price = $1, open_price = $2, open_price_time = $3, last_updated = $4
                 WHERE stock_id = $5",
            )
            .bind(price)
            .bind(open_price)
            .bind(open_price_time)
            .bind(now)
            .bind(stock.stock_id)
            .execute(&self.pool)
            .await?;

            Ok(Stock {
                market_price: price,
                open_price,
                open_price_time,
                last_updated: now,
                ..stock
            })
        } else {
            let company_name = universe::company_name(symbol);
            let sector = universe::lookup(symbol).map(|e| e.sector.to_string());

            let stock = sqlx::query_as::<_, Stock>(
                "INSERT INTO stocks (symbol, company_name, sector, market_price, open_price, open_price_time, last_updated, is_available)
                 VALUES ($1, $2, $3, $4, $4, $5, $5, TRUE)
                 RETURNING *",
            )
            .bind(symbol)
            .bind(company_name)
            .bind(sector)
            .bind(price)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

            Ok(stock)
        }
    }

    /// Write one simulated tick: new market price plus an optional open-price seed
    pub async fn apply_tick(
        &self,
        stock_id: i64,
        new_price: Decimal,
        open_seed: Option<(Decimal, DateTime<Utc>)>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        match open_seed {
            Some((open_price, open_price_time)) => {
                sqlx::query(
                    "UPDATE stocks SET market_price = $1, open_price = $2, open_price_time = $3, last_updated = $4
                     WHERE stock_id = $5",
                )
                .bind(new_price)
                .bind(open_price)
                .bind(open_price_time)
                .bind(now)
                .bind(stock_id)
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query(
                    "UPDATE stocks SET market_price = $1, last_updated = $2 WHERE stock_id = $3",
                )
                .bind(new_price)
                .bind(now)
                .bind(stock_id)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(())
    }

    /// Toggle whether a stock can be traded
    pub async fn set_availability(&self, stock_id: i64, is_available: bool) -> Result<bool> {
        let updated = sqlx::query("UPDATE stocks SET is_available = $1 WHERE stock_id = $2")
            .bind(is_available)
            .bind(stock_id)
            .execute(&self.pool)
            .await?;

        Ok(updated.rows_affected() > 0)
    }

    /// Seed the default universe if the stocks table is empty
    pub async fn seed_universe(&self) -> Result<u64> {
        if self.count().await? > 0 {
            return Ok(0);
        }

        let now = Utc::now();
        let mut inserted = 0;
        for entry in universe::UNIVERSE {
            let price = Decimal::new(entry.base_price_cents, 2);
            sqlx::query(
                "INSERT INTO stocks (symbol, company_name, sector, market_price, open_price, open_price_time, last_updated, is_available)
                 VALUES ($1, $2, $3, $4, $4, $5, $5, TRUE)
                 ON CONFLICT (symbol) DO NOTHING",
            )
            .bind(entry.symbol)
            .bind(entry.company_name)
            .bind(entry.sector)
            .bind(price)
            .bind(now)
            .execute(&self.pool)
            .await?;
            inserted += 1;
        }

        tracing::info!("Seeded {} stocks into empty universe", inserted);
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(price: i64, open: Option<i64>, open_at: Option<DateTime<Utc>>) -> Stock {
        Stock {
            stock_id: 1,
            symbol: "TSLA".to_string(),
            company_name: "Tesla Inc.".to_string(),
            sector: Some("Automotive".to_string()),
            market_price: Decimal::new(price, 2),
            open_price: open.map(|o| Decimal::new(o, 2)),
            open_price_time: open_at,
            last_updated: Utc::now(),
            is_available: true,
        }
    }

    #[test]
    fn test_change_percent() {
        let s = stock(11000, Some(10000), Some(Utc::now()));
        assert_eq!(s.change_percent(), Some(Decimal::from(10)));
    }

    #[test]
    fn test_change_percent_without_open() {
        let s = stock(11000, None, None);
        assert_eq!(s.change_percent(), None);
    }

    #[test]
    fn test_change_percent_zero_open() {
        let s = stock(11000, Some(0), Some(Utc::now()));
        assert_eq!(s.change_percent(), None);
    }

    #[test]
    fn test_has_open_price_for_same_day() {
        let now = Utc::now();
        let s = stock(11000, Some(10000), Some(now));
        assert!(s.has_open_price_for(now));
    }

    #[test]
    fn test_has_open_price_for_previous_day() {
        let now = Utc::now();
        let s = stock(11000, Some(10000), Some(now - chrono::Duration::days(1)));
        assert!(!s.has_open_price_for(now));
    }
}
