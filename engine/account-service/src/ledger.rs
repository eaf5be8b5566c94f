//! The append-only transaction ledger
//!
//! Every balance-affecting event is one immutable row: trades carry a stock
//! reference and a signed price (positive buy, negative sell); deposits and
//! withdrawals carry no stock reference and a signed amount. Holdings and
//! account statistics are always derived from this log, never stored.

use crate::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

/// One immutable ledger row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LedgerEntry {
    pub transaction_id: i64,
    pub user_id: i64,
    pub stock_id: Option<i64>,
    pub quantity: i32,
    pub price: Decimal,
    pub transaction_time: DateTime<Utc>,
    pub transaction_type: Option<String>,
}

impl LedgerEntry {
    /// Whether this entry is a funds movement rather than a trade
    pub fn is_funds_movement(&self) -> bool {
        self.stock_id.is_none()
    }
}

/// A ledger row about to be appended
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub user_id: i64,
    pub stock_id: Option<i64>,
    pub quantity: i32,
    pub price: Decimal,
    pub transaction_type: Option<String>,
}

/// Append an entry on an open connection (usually inside a transaction)
pub async fn append_entry(conn: &mut PgConnection, entry: &NewLedgerEntry) -> Result<i64> {
    let transaction_id: i64 = sqlx::query_scalar(
        "INSERT INTO transactions (user_id, stock_id, quantity, price, transaction_time, transaction_type)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING transaction_id",
    )
    .bind(entry.user_id)
    .bind(entry.stock_id)
    .bind(entry.quantity)
    .bind(entry.price)
    .bind(Utc::now())
    .bind(entry.transaction_type.as_deref())
    .fetch_one(conn)
    .await?;

    Ok(transaction_id)
}

/// Net shares owned for a user and stock, computed on an open connection.
///
/// sum(quantity where price > 0) - sum(quantity where price < 0); never
/// stored, always reduced from the log.
pub async fn shares_owned_on(
    conn: &mut PgConnection,
    user_id: i64,
    stock_id: i64,
) -> Result<i64> {
    let owned: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(CASE WHEN price > 0 THEN quantity
                                  WHEN price < 0 THEN -quantity
                                  ELSE 0 END), 0)
         FROM transactions WHERE user_id = $1 AND stock_id = $2",
    )
    .bind(user_id)
    .bind(stock_id)
    .fetch_one(conn)
    .await?;

    Ok(owned)
}

/// Pure reduction of the same quantity over already-fetched entries
pub fn net_shares(entries: &[LedgerEntry], stock_id: i64) -> i64 {
    entries
        .iter()
        .filter(|e| e.stock_id == Some(stock_id))
        .map(|e| {
            if e.price > Decimal::ZERO {
                i64::from(e.quantity)
            } else if e.price < Decimal::ZERO {
                -i64::from(e.quantity)
            } else {
                0
            }
        })
        .sum()
}

/// Ledger provides read access to the transactions table
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: PgPool,
}

impl Ledger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All of a user's entries, oldest first
    pub async fn entries_for_user(&self, user_id: i64) -> Result<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            "SELECT * FROM transactions WHERE user_id = $1 ORDER BY transaction_time, transaction_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// One page of a user's entries, newest first, plus the total count
    pub async fn entries_page(
        &self,
        user_id: i64,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<LedgerEntry>, i64)> {
        let page = page.max(1);
        let page_size = page_size.max(1);

        let entries = sqlx::query_as::<_, LedgerEntry>(
            "SELECT * FROM transactions WHERE user_id = $1
             ORDER BY transaction_time DESC, transaction_id DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page_size)
        .bind((page - 1) * page_size)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((entries, total))
    }

    /// A single entry, scoped to its owner
    pub async fn entry_for_user(
        &self,
        user_id: i64,
        transaction_id: i64,
    ) -> Result<Option<LedgerEntry>> {
        let entry = sqlx::query_as::<_, LedgerEntry>(
            "SELECT * FROM transactions WHERE transaction_id = $1 AND user_id = $2",
        )
        .bind(transaction_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Net shares owned for a user and stock
    pub async fn shares_owned(&self, user_id: i64, stock_id: i64) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        shares_owned_on(&mut conn, user_id, stock_id).await
    }

    /// Distinct stock ids appearing in a user's history (funds movements excluded)
    pub async fn traded_stock_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT DISTINCT stock_id FROM transactions
             WHERE user_id = $1 AND stock_id IS NOT NULL
             ORDER BY stock_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn entry(stock_id: Option<i64>, quantity: i32, price_cents: i64) -> LedgerEntry {
        LedgerEntry {
            transaction_id: 0,
            user_id: 1,
            stock_id,
            quantity,
            price: Decimal::new(price_cents, 2),
            transaction_time: Utc::now(),
            transaction_type: None,
        }
    }

    #[test]
    fn test_net_shares_buys_minus_sells() {
        let entries = vec![
            entry(Some(1), 5, 10000),
            entry(Some(1), 2, -12000),
            entry(Some(2), 7, 5000),
        ];

        assert_eq!(net_shares(&entries, 1), 3);
        assert_eq!(net_shares(&entries, 2), 7);
        assert_eq!(net_shares(&entries, 3), 0);
    }

    #[test]
    fn test_net_shares_ignores_funds_movements() {
        let entries = vec![entry(None, 1, 50000), entry(Some(1), 4, 10000)];
        assert_eq!(net_shares(&entries, 1), 4);
    }

    #[test]
    fn test_net_shares_zero_price_excluded() {
        let entries = vec![entry(Some(1), 5, 0), entry(Some(1), 3, 10000)];
        assert_eq!(net_shares(&entries, 1), 3);
    }

    #[test]
    fn test_is_funds_movement() {
        assert!(entry(None, 1, 50000).is_funds_movement());
        assert!(!entry(Some(1), 1, 50000).is_funds_movement());
    }
}
