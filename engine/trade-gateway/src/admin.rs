//! Admin dashboard data

use crate::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

/// Aggregate counters and recent activity for the admin dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_stocks: i64,
    pub total_users: i64,
    /// Users with at least one ledger entry
    pub active_users: i64,
    pub total_transactions: i64,
    pub monthly_volume: Vec<MonthlyVolume>,
    pub recent_transactions: Vec<RecentTransaction>,
}

/// Gross traded volume for one calendar month
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyVolume {
    pub month: String,
    pub volume: Decimal,
}

/// One row of the recent-activity feed
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecentTransaction {
    pub transaction_id: i64,
    pub username: String,
    pub symbol: Option<String>,
    pub quantity: i32,
    pub price: Decimal,
    pub transaction_time: DateTime<Utc>,
}

/// AdminService reads dashboard aggregates straight from the store
#[derive(Debug, Clone)]
pub struct AdminService {
    pool: PgPool,
}

impl AdminService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn dashboard(&self) -> Result<DashboardStats> {
        let total_stocks: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stocks").fetch_one(&self.pool).await?;
        let total_users: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users").fetch_one(&self.pool).await?;
        let active_users: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT user_id) FROM transactions")
                .fetch_one(&self.pool)
                .await?;
        let total_transactions: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM transactions").fetch_one(&self.pool).await?;

        let monthly: Vec<(String, Decimal)> = sqlx::query_as(
            "SELECT to_char(date_trunc('month', transaction_time), 'YYYY-MM') AS month,
                    COALESCE(SUM(ABS(price * quantity)), 0) AS volume
             FROM transactions
             GROUP BY 1
             ORDER BY 1",
        )
        .fetch_all(&self.pool)
        .await?;

        let recent_transactions = sqlx::query_as::<_, RecentTransaction>(
            "SELECT t.transaction_id, u.username, s.symbol, t.quantity, t.price, t.transaction_time
             FROM transactions t
             JOIN users u ON u.user_id = t.user_id
             LEFT JOIN stocks s ON s.stock_id = t.stock_id
             ORDER BY t.transaction_time DESC
             LIMIT 10",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(DashboardStats {
            total_stocks,
            total_users,
            active_users,
            total_transactions,
            monthly_volume: monthly
                .into_iter()
                .map(|(month, volume)| MonthlyVolume { month, volume })
                .collect(),
            recent_transactions,
        })
    }
}
