//! Core simulator loop

use crate::config::SimulatorConfig;
use crate::Result;
use chrono::{DateTime, Utc};
use market_data::{Stock, StockStore};
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// The writes one tick applies to a stock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickPlan {
    pub new_price: Decimal,
    /// Open price + timestamp to record when this is the day's first update
    pub open_seed: Option<(Decimal, DateTime<Utc>)>,
}

/// Compute one tick for a stock: apply the delta, floor the price, and seed
/// the open price with the pre-delta price when none is recorded for the
/// current UTC calendar day.
pub fn plan_tick(stock: &Stock, delta: Decimal, floor: Decimal, now: DateTime<Utc>) -> TickPlan {
    let new_price = (stock.market_price + delta).max(floor);

    let open_seed = if stock.has_open_price_for(now) {
        None
    } else {
        Some((new_price - delta, now))
    };

    TickPlan { new_price, open_seed }
}

/// PriceSimulator perturbs every stored price on a fixed period
pub struct PriceSimulator {
    store: StockStore,
    config: SimulatorConfig,
}

impl PriceSimulator {
    pub fn new(store: StockStore, config: SimulatorConfig) -> Self {
        Self { store, config }
    }

    /// Run the tick loop until the shutdown signal flips to true.
    ///
    /// The loop never aborts on per-tick failures; it logs and waits for the
    /// next tick.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Price simulator starting with interval {:?}", self.config.tick_interval);

        let mut interval = tokio::time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.update_all_prices().await {
                        error!("Error updating stock prices: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Price simulator stopping");
    }

    /// One pass over every stock. Failures for a single stock are logged and
    /// do not abort the batch.
    pub async fn update_all_prices(&self) -> Result<()> {
        let stocks = self.store.list_all().await?;
        if stocks.is_empty() {
            warn!("No stocks found to update");
            return Ok(());
        }

        debug!("Updating prices for {} stocks", stocks.len());

        let now = Utc::now();
        for stock in &stocks {
            let delta = self.random_delta();
            let plan = plan_tick(stock, delta, self.config.price_floor, now);

            if let Some((open_price, _)) = plan.open_seed {
                info!("Set new open price for {}: {}", stock.symbol, open_price);
            }

            if let Err(e) = self
                .store
                .apply_tick(stock.stock_id, plan.new_price, plan.open_seed, now)
                .await
            {
                warn!("Failed to update price for {}: {}", stock.symbol, e);
                continue;
            }

            debug!(
                "Updated {} price: {} (change: {})",
                stock.symbol, plan.new_price, delta
            );
        }

        Ok(())
    }

    /// Uniform delta in [-max_delta, +max_delta], cent granularity
    fn random_delta(&self) -> Decimal {
        let bound = (self.config.max_delta * Decimal::from(100)).to_i64().unwrap_or(3000).max(1);
        let cents = rand::thread_rng().gen_range(-bound..=bound);
        Decimal::new(cents, 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(price_cents: i64, open_at: Option<DateTime<Utc>>) -> Stock {
        Stock {
            stock_id: 1,
            symbol: "TSLA".to_string(),
            company_name: "Tesla Inc.".to_string(),
            sector: None,
            market_price: Decimal::new(price_cents, 2),
            open_price: open_at.map(|_| Decimal::new(price_cents, 2)),
            open_price_time: open_at,
            last_updated: Utc::now(),
            is_available: true,
        }
    }

    #[test]
    fn test_tick_applies_delta() {
        let now = Utc::now();
        let plan = plan_tick(&stock(10000, Some(now)), Decimal::from(7), Decimal::ONE, now);
        assert_eq!(plan.new_price, Decimal::from(107));
        assert_eq!(plan.open_seed, None);
    }

    #[test]
    fn test_tick_clamps_to_floor() {
        // Price 50.00 with delta -60 clamps to the floor of 1.00
        let now = Utc::now();
        let plan = plan_tick(&stock(5000, Some(now)), Decimal::from(-60), Decimal::ONE, now);
        assert_eq!(plan.new_price, Decimal::ONE);
    }

    #[test]
    fn test_tick_seeds_open_price_when_missing() {
        let now = Utc::now();
        let delta = Decimal::from(5);
        let plan = plan_tick(&stock(10000, None), delta, Decimal::ONE, now);

        // Open price is the pre-delta price
        let (open, at) = plan.open_seed.unwrap();
        assert_eq!(open, Decimal::from(100));
        assert_eq!(at, now);
    }

    #[test]
    fn test_tick_reseeds_open_price_on_new_day() {
        let now = Utc::now();
        let yesterday = now - chrono::Duration::days(1);
        let plan = plan_tick(&stock(10000, Some(yesterday)), Decimal::from(5), Decimal::ONE, now);
        assert!(plan.open_seed.is_some());
    }

    #[test]
    fn test_tick_keeps_same_day_open_price() {
        let now = Utc::now();
        let plan = plan_tick(&stock(10000, Some(now)), Decimal::from(5), Decimal::ONE, now);
        assert!(plan.open_seed.is_none());
    }
}
