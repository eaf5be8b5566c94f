//! Trade settlement
//!
//! Validates and executes buy/sell requests. The balance mutation and the
//! ledger append are a single database transaction, and the user row is
//! locked for the duration, so concurrent settlements for one user serialize
//! instead of racing the ownership check.

use crate::ledger::{self, NewLedgerEntry};
use crate::{AccountServiceError, Result};
use market_data::MarketDataService;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// Trade side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl FromStr for TradeSide {
    type Err = AccountServiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(TradeSide::Buy),
            "sell" => Ok(TradeSide::Sell),
            other => Err(AccountServiceError::InvalidSide(other.to_string())),
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

/// A trade request; the stock may be referenced by id, symbol, or both
#[derive(Debug, Clone)]
pub struct TradeRequest {
    pub user_id: i64,
    pub stock_id: Option<i64>,
    pub symbol: Option<String>,
    pub quantity: i32,
    pub side: TradeSide,
}

/// Result of a settled trade
#[derive(Debug, Clone, Serialize)]
pub struct TradeOutcome {
    pub transaction_id: i64,
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: i32,
    pub price: Decimal,
    pub total_amount: Decimal,
    pub new_balance: Decimal,
    pub total_shares: i64,
}

/// The state changes a valid trade will apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradePlan {
    pub new_balance: Decimal,
    pub signed_price: Decimal,
    pub total_amount: Decimal,
    pub total_shares: i64,
}

/// Validate a trade against the user's balance and holdings.
///
/// Pure: callers supply the locked balance and the derived share count, and
/// apply the returned plan atomically.
pub fn plan_trade(
    side: TradeSide,
    symbol: &str,
    balance: Option<Decimal>,
    shares_owned: i64,
    price: Decimal,
    quantity: i32,
) -> Result<TradePlan> {
    if quantity <= 0 {
        return Err(AccountServiceError::InvalidQuantity(quantity));
    }

    let total_amount = price * Decimal::from(quantity);
    let available = balance.unwrap_or(Decimal::ZERO);

    match side {
        TradeSide::Buy => {
            if available < total_amount {
                return Err(AccountServiceError::InsufficientFunds {
                    required: total_amount,
                    available,
                });
            }
            Ok(TradePlan {
                new_balance: available - total_amount,
                signed_price: price,
                total_amount,
                total_shares: shares_owned + i64::from(quantity),
            })
        }
        TradeSide::Sell => {
            if shares_owned < i64::from(quantity) {
                return Err(AccountServiceError::InsufficientShares {
                    symbol: symbol.to_string(),
                    owned: shares_owned,
                    requested: i64::from(quantity),
                });
            }
            Ok(TradePlan {
                new_balance: available + total_amount,
                signed_price: -price,
                total_amount,
                total_shares: shares_owned - i64::from(quantity),
            })
        }
    }
}

/// SettlementService executes trades against the price store and the ledger
pub struct SettlementService {
    pool: PgPool,
    market: Arc<MarketDataService>,
}

impl SettlementService {
    pub fn new(pool: PgPool, market: Arc<MarketDataService>) -> Self {
        Self { pool, market }
    }

    /// Execute a buy or sell request.
    ///
    /// Validation order: resolve the user, resolve the stock by id then
    /// symbol, check the availability flag, refresh the price best-effort,
    /// then check funds or holdings and settle atomically.
    pub async fn execute_trade(&self, request: TradeRequest) -> Result<TradeOutcome> {
        let TradeRequest { user_id, stock_id, symbol, quantity, side } = request;

        let user_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE user_id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        if !user_exists {
            return Err(AccountServiceError::Unauthenticated);
        }

        let mut stock = None;
        if let Some(id) = stock_id.filter(|id| *id > 0) {
            stock = self.market.store().get_by_id(id).await?;
        }
        if stock.is_none() {
            if let Some(symbol) = symbol.as_deref().filter(|s| !s.is_empty()) {
                stock = self.market.store().get_by_symbol(symbol).await?;
            }
        }
        let stock = stock.ok_or_else(|| AccountServiceError::StockNotFound {
            reference: symbol
                .clone()
                .unwrap_or_else(|| stock_id.map(|id| id.to_string()).unwrap_or_default()),
        })?;

        if !stock.is_available {
            return Err(AccountServiceError::StockUnavailable { symbol: stock.symbol.clone() });
        }

        // Best-effort price refresh; provider unreachability is non-fatal
        let price = match self.market.refresh_symbol(&stock.symbol).await {
            Ok(quote) => quote.price,
            Err(e) => {
                warn!("Price refresh failed for {}, using stored price: {}", stock.symbol, e);
                stock.market_price
            }
        };

        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent settlements for this user
        let balance: Option<Decimal> =
            sqlx::query_scalar("SELECT balance FROM users WHERE user_id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AccountServiceError::Unauthenticated)?;

        let shares_owned = ledger::shares_owned_on(&mut *tx, user_id, stock.stock_id).await?;

        let plan = plan_trade(side, &stock.symbol, balance, shares_owned, price, quantity)?;

        sqlx::query("UPDATE users SET balance = $1 WHERE user_id = $2")
            .bind(plan.new_balance)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let transaction_id = ledger::append_entry(
            &mut *tx,
            &NewLedgerEntry {
                user_id,
                stock_id: Some(stock.stock_id),
                quantity,
                price: plan.signed_price,
                transaction_type: None,
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            "Settled {} of {} x{} at {} for user {}; balance {}",
            side, stock.symbol, quantity, price, user_id, plan.new_balance
        );

        Ok(TradeOutcome {
            transaction_id,
            symbol: stock.symbol,
            side,
            quantity,
            price,
            total_amount: plan.total_amount,
            new_balance: plan.new_balance,
            total_shares: plan.total_shares,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dollars(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!("buy".parse::<TradeSide>().unwrap(), TradeSide::Buy);
        assert_eq!("SELL".parse::<TradeSide>().unwrap(), TradeSide::Sell);
        assert!(matches!(
            "hold".parse::<TradeSide>(),
            Err(AccountServiceError::InvalidSide(s)) if s == "hold"
        ));
    }

    #[test]
    fn test_buy_deducts_balance() {
        // Balance 1000.00, price 100.00, buy 5 => balance 500.00, 5 shares
        let plan =
            plan_trade(TradeSide::Buy, "TSLA", Some(dollars(100000)), 0, dollars(10000), 5)
                .unwrap();

        assert_eq!(plan.new_balance, dollars(50000));
        assert_eq!(plan.signed_price, dollars(10000));
        assert_eq!(plan.total_amount, dollars(50000));
        assert_eq!(plan.total_shares, 5);
    }

    #[test]
    fn test_sell_credits_balance() {
        // Continuing: balance 500.00, price 120.00, sell 5 => balance 1100.00
        let plan =
            plan_trade(TradeSide::Sell, "TSLA", Some(dollars(50000)), 5, dollars(12000), 5)
                .unwrap();

        assert_eq!(plan.new_balance, dollars(110000));
        assert_eq!(plan.signed_price, dollars(-12000));
        assert_eq!(plan.total_shares, 0);
    }

    #[test]
    fn test_buy_insufficient_funds() {
        // Balance 50.00, price 100.00, buy 1 => rejected, nothing to apply
        let err = plan_trade(TradeSide::Buy, "TSLA", Some(dollars(5000)), 0, dollars(10000), 1)
            .unwrap_err();

        match err {
            AccountServiceError::InsufficientFunds { required, available } => {
                assert_eq!(required, dollars(10000));
                assert_eq!(available, dollars(5000));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_sell_insufficient_shares() {
        // Owns 3, sells 5 => rejected with owned vs requested
        let err = plan_trade(TradeSide::Sell, "TSLA", Some(dollars(5000)), 3, dollars(10000), 5)
            .unwrap_err();

        match err {
            AccountServiceError::InsufficientShares { symbol, owned, requested } => {
                assert_eq!(symbol, "TSLA");
                assert_eq!(owned, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unfunded_balance_treated_as_zero() {
        let err = plan_trade(TradeSide::Buy, "TSLA", None, 0, dollars(10000), 1).unwrap_err();
        assert!(matches!(err, AccountServiceError::InsufficientFunds { .. }));
    }

    #[test]
    fn test_round_trip_restores_balance_and_shares() {
        // Buy then sell the same quantity at the same price
        let buy =
            plan_trade(TradeSide::Buy, "TSLA", Some(dollars(100000)), 0, dollars(10000), 5)
                .unwrap();
        let sell = plan_trade(
            TradeSide::Sell,
            "TSLA",
            Some(buy.new_balance),
            buy.total_shares,
            dollars(10000),
            5,
        )
        .unwrap();

        assert_eq!(sell.new_balance, dollars(100000));
        assert_eq!(sell.total_shares, 0);
    }

    #[test]
    fn test_sell_never_goes_negative() {
        // A successful sell always leaves a non-negative share count
        for owned in 0..10 {
            for qty in 1..10 {
                match plan_trade(
                    TradeSide::Sell,
                    "TSLA",
                    Some(Decimal::ZERO),
                    owned,
                    dollars(10000),
                    qty,
                ) {
                    Ok(plan) => assert!(plan.total_shares >= 0),
                    Err(AccountServiceError::InsufficientShares { .. }) => {
                        assert!(owned < i64::from(qty))
                    }
                    Err(other) => panic!("unexpected error: {other:?}"),
                }
            }
        }
    }

    #[test]
    fn test_rejects_non_positive_quantity() {
        assert!(matches!(
            plan_trade(TradeSide::Buy, "TSLA", Some(dollars(100000)), 0, dollars(10000), 0),
            Err(AccountServiceError::InvalidQuantity(0))
        ));
        assert!(matches!(
            plan_trade(TradeSide::Sell, "TSLA", Some(dollars(100000)), 5, dollars(10000), -3),
            Err(AccountServiceError::InvalidQuantity(-3))
        ));
    }
}
