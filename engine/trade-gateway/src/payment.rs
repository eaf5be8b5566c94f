//! Simulated payment provider
//!
//! Stands in for the external checkout/payout gateway: deposits go through a
//! short-lived session object the client "completes", payouts are
//! acknowledged with a reference. Only the deposit/withdrawal flows touch
//! this; balances and ledger entries stay with the account service.

use crate::{GatewayError, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use tracing::info;

/// A pending deposit checkout session
#[derive(Debug, Clone, Serialize)]
pub struct DepositSession {
    pub session_ref: Uuid,
    pub amount: Decimal,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Acknowledgement for a simulated payout
#[derive(Debug, Clone, Serialize)]
pub struct PayoutReceipt {
    pub payout_ref: Uuid,
    pub amount: Decimal,
    pub destination: String,
}

/// PaymentService holds pending sessions in memory
#[derive(Debug, Default)]
pub struct PaymentService {
    sessions: DashMap<Uuid, DepositSession>,
}

impl PaymentService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a deposit checkout session
    pub fn create_deposit(&self, amount: Decimal, description: &str) -> Result<DepositSession> {
        if amount <= Decimal::ZERO {
            return Err(GatewayError::Account(
                account_service::AccountServiceError::InvalidAmount,
            ));
        }

        let session = DepositSession {
            session_ref: Uuid::new_v4(),
            amount,
            description: description.to_string(),
            created_at: Utc::now(),
        };
        self.sessions.insert(session.session_ref, session.clone());

        info!("Created deposit session {} for {}", session.session_ref, amount);
        Ok(session)
    }

    /// Consume a completed session, returning it exactly once
    pub fn take_session(&self, session_ref: Uuid) -> Result<DepositSession> {
        self.sessions
            .remove(&session_ref)
            .map(|(_, session)| session)
            .ok_or(GatewayError::PaymentSessionNotFound)
    }

    /// Acknowledge a payout to an external destination
    pub fn simulate_payout(&self, amount: Decimal, destination: &str) -> Result<PayoutReceipt> {
        if destination.trim().is_empty() {
            return Err(GatewayError::InvalidPayoutDestination);
        }
        if amount <= Decimal::ZERO {
            return Err(GatewayError::Account(
                account_service::AccountServiceError::InvalidAmount,
            ));
        }

        let receipt =
            PayoutReceipt { payout_ref: Uuid::new_v4(), amount, destination: destination.to_string() };
        info!("Simulated payout {} of {} to {}", receipt.payout_ref, amount, destination);
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_session_round_trip() {
        let payments = PaymentService::new();
        let session = payments.create_deposit(Decimal::from(100), "Add funds").unwrap();

        let taken = payments.take_session(session.session_ref).unwrap();
        assert_eq!(taken.amount, Decimal::from(100));

        // A session completes exactly once
        assert!(payments.take_session(session.session_ref).is_err());
    }

    #[test]
    fn test_deposit_rejects_non_positive_amount() {
        let payments = PaymentService::new();
        assert!(payments.create_deposit(Decimal::ZERO, "x").is_err());
        assert!(payments.create_deposit(Decimal::from(-5), "x").is_err());
    }

    #[test]
    fn test_payout_requires_destination() {
        let payments = PaymentService::new();
        assert!(payments.simulate_payout(Decimal::from(10), "  ").is_err());

        let receipt = payments.simulate_payout(Decimal::from(10), "acct_123").unwrap();
        assert_eq!(receipt.destination, "acct_123");
    }
}
