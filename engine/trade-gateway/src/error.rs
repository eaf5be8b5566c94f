//! Error types and failure envelopes for the gateway

use account_service::AccountServiceError;
use serde_json::json;
use thiserror::Error;
use warp::http::StatusCode;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    Account(#[from] AccountServiceError),

    #[error("Market data error: {0}")]
    MarketData(#[from] market_data::MarketDataError),

    #[error("Invalid or expired session token")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Payment session not found")]
    PaymentSessionNotFound,

    #[error("Transaction not found")]
    TransactionNotFound,

    #[error("Invalid payout destination")]
    InvalidPayoutDestination,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl GatewayError {
    /// HTTP status plus the user-facing failure payload for this error.
    ///
    /// Internal detail (database, provider) is logged server-side and
    /// replaced with a generic message; validation errors pass their message
    /// through and never mutate state.
    pub fn to_failure(&self) -> (StatusCode, serde_json::Value) {
        use AccountServiceError as E;

        match self {
            GatewayError::Account(err) => match err {
                E::Unauthenticated | E::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, failure_body(&err.to_string()))
                }
                E::AccountNotFound { .. } | E::StockNotFound { .. } => {
                    (StatusCode::NOT_FOUND, failure_body(&err.to_string()))
                }
                E::InsufficientShares { owned, requested, .. } => {
                    let mut body = failure_body(&err.to_string());
                    body["currentShares"] = json!(owned);
                    body["requestedShares"] = json!(requested);
                    (StatusCode::BAD_REQUEST, body)
                }
                E::StockUnavailable { .. }
                | E::InsufficientFunds { .. }
                | E::InvalidSide(_)
                | E::InvalidQuantity(_)
                | E::InvalidAmount
                | E::MissingFields
                | E::WeakPassword
                | E::UsernameTaken
                | E::EmailTaken => (StatusCode::BAD_REQUEST, failure_body(&err.to_string())),
                E::MarketData(_) | E::DatabaseError(_) | E::Internal { .. } => {
                    tracing::error!("Internal error during request: {}", err);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        failure_body("Error processing request"),
                    )
                }
            },
            GatewayError::InvalidToken(_) => (
                StatusCode::UNAUTHORIZED,
                failure_body("You must be logged in to perform this action"),
            ),
            GatewayError::PaymentSessionNotFound => {
                (StatusCode::NOT_FOUND, failure_body("Payment session not found"))
            }
            GatewayError::TransactionNotFound => {
                (StatusCode::NOT_FOUND, failure_body("Transaction not found"))
            }
            GatewayError::InvalidPayoutDestination => {
                (StatusCode::BAD_REQUEST, failure_body("Invalid payout destination"))
            }
            GatewayError::MarketData(err) => {
                tracing::error!("Market data error during request: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, failure_body("Error processing request"))
            }
            GatewayError::DatabaseError(err) => {
                tracing::error!("Database error during request: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, failure_body("Error processing request"))
            }
        }
    }
}

fn failure_body(message: &str) -> serde_json::Value {
    json!({
        "success": false,
        "message": message,
    })
}

/// Render an error as a JSON reply with its mapped status code
pub fn failure_reply(err: GatewayError) -> warp::reply::WithStatus<warp::reply::Json> {
    let (status, body) = err.to_failure();
    warp::reply::with_status(warp::reply::json(&body), status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_insufficient_shares_reports_counts() {
        let err = GatewayError::Account(AccountServiceError::InsufficientShares {
            symbol: "TSLA".to_string(),
            owned: 3,
            requested: 5,
        });
        let (status, body) = err.to_failure();

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["currentShares"], json!(3));
        assert_eq!(body["requestedShares"], json!(5));
    }

    #[test]
    fn test_insufficient_funds_is_bad_request() {
        let err = GatewayError::Account(AccountServiceError::InsufficientFunds {
            required: Decimal::from(100),
            available: Decimal::from(50),
        });
        let (status, _) = err.to_failure();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_errors_are_masked() {
        let err = GatewayError::Account(AccountServiceError::Internal {
            message: "secret detail".to_string(),
        });
        let (status, body) = err.to_failure();

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body["message"].as_str().unwrap().contains("secret"));
    }

    #[test]
    fn test_unauthenticated_is_401() {
        let err = GatewayError::Account(AccountServiceError::Unauthenticated);
        let (status, _) = err.to_failure();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
