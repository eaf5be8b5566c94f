//! Error types for AccountService

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccountServiceError {
    #[error("You must be logged in to perform this action")]
    Unauthenticated,

    #[error("Account not found: {user_id}")]
    AccountNotFound { user_id: i64 },

    #[error("Stock {reference} not found. Please try again.")]
    StockNotFound { reference: String },

    #[error("Stock {symbol} is currently unavailable for trading")]
    StockUnavailable { symbol: String },

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    #[error("You don't own enough shares of {symbol}")]
    InsufficientShares { symbol: String, owned: i64, requested: i64 },

    #[error("Invalid transaction type: {0}")]
    InvalidSide(String),

    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(i32),

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Please fill in all required fields")]
    MissingFields,

    #[error("Password must be at least 8 characters long and include an uppercase letter, lowercase letter, number, and special character")]
    WeakPassword,

    #[error("Username is already taken")]
    UsernameTaken,

    #[error("Email is already taken")]
    EmailTaken,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Market data error: {0}")]
    MarketData(#[from] market_data::MarketDataError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}
