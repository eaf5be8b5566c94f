//! Portfolio math derived from the ledger
//!
//! Holdings, cost basis, and P&L are reduced from the transaction log against
//! current market prices. The average purchase price uses buy-side entries
//! only; partial sells do not reduce the cost basis.

use crate::ledger::{self, Ledger, LedgerEntry};
use crate::Result;
use market_data::{Stock, StockStore};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;

/// A user's net position in one symbol
#[derive(Debug, Clone, Serialize)]
pub struct Holding {
    pub stock_id: i64,
    pub symbol: String,
    pub company_name: String,
    pub quantity: i64,
    pub average_cost: Decimal,
    pub current_price: Decimal,
    pub profit_loss: Decimal,
    pub profit_loss_percent: String,
}

/// Aggregate account statistics over the whole ledger
#[derive(Debug, Clone, Serialize)]
pub struct AccountStats {
    pub total_trades: i64,
    pub unique_stocks: i64,
    pub total_invested: Decimal,
    pub total_returned: Decimal,
    pub total_return: Decimal,
    pub return_percent: String,
}

/// Format a percentage with two decimals, e.g. "12.34%"
pub fn format_percent(value: Decimal) -> String {
    format!("{:.2}%", value)
}

/// Average purchase price for a stock: buy-side spend over buy-side quantity.
/// Returns zero when the user never bought the stock.
pub fn average_purchase_price(entries: &[LedgerEntry], stock_id: i64) -> Decimal {
    let mut total_spent = Decimal::ZERO;
    let mut shares_bought = 0i64;

    for entry in entries.iter().filter(|e| e.stock_id == Some(stock_id)) {
        if entry.price > Decimal::ZERO {
            total_spent += entry.price * Decimal::from(entry.quantity);
            shares_bought += i64::from(entry.quantity);
        }
    }

    if shares_bought <= 0 {
        Decimal::ZERO
    } else {
        total_spent / Decimal::from(shares_bought)
    }
}

/// P&L percentage against the cost basis; "0.00%" when the basis is not positive
pub fn profit_loss_percent(current_price: Decimal, average_cost: Decimal) -> String {
    if average_cost > Decimal::ZERO {
        format_percent((current_price - average_cost) / average_cost * Decimal::from(100))
    } else {
        "0.00%".to_string()
    }
}

/// Build the holding for one stock, or None when fully divested
pub fn build_holding(stock: &Stock, entries: &[LedgerEntry]) -> Option<Holding> {
    let shares_owned = ledger::net_shares(entries, stock.stock_id);
    if shares_owned <= 0 {
        return None;
    }

    let average_cost = average_purchase_price(entries, stock.stock_id);
    let profit_loss = (stock.market_price - average_cost) * Decimal::from(shares_owned);
    let profit_loss_percent = profit_loss_percent(stock.market_price, average_cost);

    Some(Holding {
        stock_id: stock.stock_id,
        symbol: stock.symbol.clone(),
        company_name: stock.company_name.clone(),
        quantity: shares_owned,
        average_cost,
        current_price: stock.market_price,
        profit_loss,
        profit_loss_percent,
    })
}

/// Aggregate statistics over all of a user's entries
pub fn account_stats(entries: &[LedgerEntry]) -> AccountStats {
    let total_trades = entries.len() as i64;
    let unique_stocks = entries.iter().map(|e| e.stock_id).collect::<BTreeSet<_>>().len() as i64;

    let mut total_invested = Decimal::ZERO;
    let mut total_returned = Decimal::ZERO;
    for entry in entries {
        let amount = entry.price * Decimal::from(entry.quantity);
        if entry.price > Decimal::ZERO {
            total_invested += amount;
        } else if entry.price < Decimal::ZERO {
            total_returned += amount;
        }
    }

    let total_return = total_returned - total_invested;
    let return_percent = if total_invested > Decimal::ZERO {
        format_percent(total_return / total_invested * Decimal::from(100))
    } else {
        "0.00%".to_string()
    };

    AccountStats {
        total_trades,
        unique_stocks,
        total_invested,
        total_returned,
        total_return,
        return_percent,
    }
}

/// PortfolioService derives holdings and stats for a user on demand
#[derive(Debug, Clone)]
pub struct PortfolioService {
    ledger: Ledger,
    stocks: StockStore,
}

impl PortfolioService {
    pub fn new(ledger: Ledger, stocks: StockStore) -> Self {
        Self { ledger, stocks }
    }

    /// Current holdings for a user, ordered by stock id. Read-only.
    pub async fn holdings(&self, user_id: i64) -> Result<Vec<Holding>> {
        let entries = self.ledger.entries_for_user(user_id).await?;
        let mut holdings = Vec::new();

        for stock_id in self.ledger.traded_stock_ids(user_id).await? {
            let Some(stock) = self.stocks.get_by_id(stock_id).await? else {
                tracing::warn!("Ledger references missing stock {}", stock_id);
                continue;
            };
            if let Some(holding) = build_holding(&stock, &entries) {
                holdings.push(holding);
            }
        }

        Ok(holdings)
    }

    /// Aggregate account statistics for a user
    pub async fn stats(&self, user_id: i64) -> Result<AccountStats> {
        let entries = self.ledger.entries_for_user(user_id).await?;
        Ok(account_stats(&entries))
    }

    /// Stocks the user currently holds shares in
    pub async fn held_stocks(&self, user_id: i64) -> Result<Vec<Stock>> {
        let entries = self.ledger.entries_for_user(user_id).await?;
        let mut held = Vec::new();

        for stock_id in self.ledger.traded_stock_ids(user_id).await? {
            if ledger::net_shares(&entries, stock_id) <= 0 {
                continue;
            }
            if let Some(stock) = self.stocks.get_by_id(stock_id).await? {
                held.push(stock);
            }
        }

        Ok(held)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(stock_id: Option<i64>, quantity: i32, price_cents: i64) -> LedgerEntry {
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

    fn stock(stock_id: i64, price_cents: i64) -> Stock {
        Stock {
            stock_id,
            symbol: "TSLA".to_string(),
            company_name: "Tesla Inc.".to_string(),
            sector: Some("Automotive".to_string()),
            market_price: Decimal::new(price_cents, 2),
            open_price: None,
            open_price_time: None,
            last_updated: Utc::now(),
            is_available: true,
        }
    }

    #[test]
    fn test_average_purchase_price_buys_only() {
        // Two buys at different prices; the sell must not move the basis
        let entries = vec![
            entry(Some(1), 10, 1000),
            entry(Some(1), 10, 2000),
            entry(Some(1), 5, -3000),
        ];
        assert_eq!(average_purchase_price(&entries, 1), Decimal::new(1500, 2));
    }

    #[test]
    fn test_average_purchase_price_no_buys() {
        assert_eq!(average_purchase_price(&[], 1), Decimal::ZERO);
    }

    #[test]
    fn test_build_holding_profit_loss() {
        // Bought 5 at $100, price now $120
        let entries = vec![entry(Some(1), 5, 10000)];
        let holding = build_holding(&stock(1, 12000), &entries).unwrap();

        assert_eq!(holding.quantity, 5);
        assert_eq!(holding.average_cost, Decimal::new(10000, 2));
        assert_eq!(holding.profit_loss, Decimal::from(100));
        assert_eq!(holding.profit_loss_percent, "20.00%");
    }

    #[test]
    fn test_build_holding_skips_divested() {
        let entries = vec![entry(Some(1), 5, 10000), entry(Some(1), 5, -12000)];
        assert!(build_holding(&stock(1, 12000), &entries).is_none());
    }

    #[test]
    fn test_zero_cost_basis_reports_flat_percent() {
        // Zero or negative basis must report "0.00%", never divide by zero
        assert_eq!(profit_loss_percent(Decimal::from(120), Decimal::ZERO), "0.00%");
        assert_eq!(profit_loss_percent(Decimal::from(120), Decimal::from(-1)), "0.00%");
        assert_eq!(profit_loss_percent(Decimal::from(120), Decimal::from(100)), "20.00%");
    }

    #[test]
    fn test_holdings_are_idempotent() {
        let entries = vec![entry(Some(1), 5, 10000), entry(Some(1), 2, -11000)];
        let s = stock(1, 12000);

        let first = build_holding(&s, &entries).unwrap();
        let second = build_holding(&s, &entries).unwrap();
        assert_eq!(first.quantity, second.quantity);
        assert_eq!(first.profit_loss, second.profit_loss);
        assert_eq!(first.profit_loss_percent, second.profit_loss_percent);
    }

    #[test]
    fn test_account_stats() {
        let entries = vec![
            entry(Some(1), 5, 10000),  // invested 500
            entry(Some(1), 5, -12000), // returned -600
            entry(None, 1, 25000),     // deposit counts as invested
        ];
        let stats = account_stats(&entries);

        assert_eq!(stats.total_trades, 3);
        assert_eq!(stats.unique_stocks, 2); // stock 1 and the funds bucket
        assert_eq!(stats.total_invested, Decimal::from(750));
        assert_eq!(stats.total_returned, Decimal::from(-600));
        assert_eq!(stats.total_return, Decimal::from(-1350));
        assert_eq!(stats.return_percent, "-180.00%");
    }

    #[test]
    fn test_account_stats_empty_ledger() {
        let stats = account_stats(&[]);
        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.total_invested, Decimal::ZERO);
        assert_eq!(stats.return_percent, "0.00%");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(Decimal::new(1234, 2)), "12.34%");
        assert_eq!(format_percent(Decimal::new(-550, 2)), "-5.50%");
        assert_eq!(format_percent(Decimal::ZERO), "0.00%");
    }
}
