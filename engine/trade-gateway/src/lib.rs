//! TradeGateway - REST API for trading, portfolio, and account operations
//!
//! Exposes the core services as JSON endpoints: auth, quotes, the stock list,
//! trade execution, portfolio and transaction history, deposits/withdrawals,
//! and admin dashboard data. Every response is a structured success/failure
//! envelope.

pub mod admin;
pub mod auth;
pub mod config;
pub mod error;
pub mod payment;
pub mod rest_api;

pub use auth::{AuthUser, Claims};
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use payment::{DepositSession, PaymentService};
pub use rest_api::{create_routes, AppState};

// Result type alias
pub type Result<T> = std::result::Result<T, GatewayError>;
