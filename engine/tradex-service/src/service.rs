//! Component wiring and lifecycle

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use account_service::{AccountService, Ledger, PortfolioService, SettlementService};
use market_data::{AlphaQuoteClient, MarketDataService, QuoteCache, StockStore};
use price_simulator::PriceSimulator;
use trade_gateway::rest_api::AppState;
use trade_gateway::{create_routes, PaymentService};

use crate::config::ServiceConfig;

/// ServiceState owns every component and the shutdown signal
pub struct ServiceState {
    pub config: ServiceConfig,
    pub pool: PgPool,
    pub app: Arc<AppState>,
    simulator: Arc<PriceSimulator>,
    shutdown_tx: watch::Sender<bool>,
}

impl ServiceState {
    /// Connect, migrate, seed, and wire all components
    pub async fn new(config: ServiceConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await
            .context("Failed to connect to database")?;

        sqlx::migrate!("./migrations").run(&pool).await.context("Failed to run migrations")?;
        info!("Database connected and migrations applied");

        let store = StockStore::new(pool.clone());
        if config.service.seed_universe {
            store.seed_universe().await?;
        }

        let cache = Arc::new(QuoteCache::new(config.market_data.quote_cache_ttl));
        let provider = Arc::new(AlphaQuoteClient::new(&config.market_data)?);
        let market = Arc::new(MarketDataService::new(
            store.clone(),
            cache,
            provider,
            config.market_data.clone(),
        ));

        let ledger = Ledger::new(pool.clone());
        let app = Arc::new(AppState {
            accounts: AccountService::new(pool.clone()),
            ledger: ledger.clone(),
            portfolio: PortfolioService::new(ledger, store.clone()),
            settlement: SettlementService::new(pool.clone(), market.clone()),
            market,
            stocks: store.clone(),
            payments: PaymentService::new(),
            admin: trade_gateway::admin::AdminService::new(pool.clone()),
            pool: pool.clone(),
            auth: config.gateway.auth.clone(),
        });

        let simulator = Arc::new(PriceSimulator::new(store, config.simulator.clone()));
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self { config, pool, app, simulator, shutdown_tx })
    }

    /// A receiver that flips to true when shutdown begins
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Flip the shutdown signal; running tasks exit between ticks/requests
    pub fn initiate_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Spawn the price simulator task
    pub fn start_price_simulator(&self) -> tokio::task::JoinHandle<()> {
        let simulator = self.simulator.clone();
        let shutdown = self.shutdown_signal();
        tokio::spawn(async move {
            simulator.run(shutdown).await;
        })
    }

    /// Serve the REST API until shutdown
    pub async fn run_gateway(&self) -> Result<()> {
        let addr = self
            .config
            .gateway
            .server_addr()
            .context("Invalid gateway server address")?;

        let routes = create_routes(self.app.clone());
        let mut shutdown = self.shutdown_signal();

        let (bound, server) =
            warp::serve(routes).bind_with_graceful_shutdown(addr, async move {
                let _ = shutdown.changed().await;
            });

        info!("TradeGateway listening on {}", bound);
        server.await;
        Ok(())
    }
}
