//! AccountService - user accounts, balances, ledger, and trade settlement
//!
//! This crate manages user accounts and cash balances, the append-only
//! transaction ledger they share, the portfolio math derived from it, and the
//! settlement path that executes buy/sell requests against the price store.

pub mod account;
pub mod error;
pub mod ledger;
pub mod portfolio;
pub mod settlement;

pub use account::{AccountService, FundsOutcome, NewUser, UpdateProfile, User};
pub use error::AccountServiceError;
pub use ledger::{Ledger, LedgerEntry, NewLedgerEntry};
pub use portfolio::{AccountStats, Holding, PortfolioService};
pub use settlement::{SettlementService, TradeOutcome, TradeRequest, TradeSide};

// Result type alias
pub type Result<T> = std::result::Result<T, AccountServiceError>;
