//! AccountService implementation

use crate::ledger::{self, NewLedgerEntry};
use crate::{AccountServiceError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;

/// User represents one registered account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Absent until the account is first funded
    pub balance: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.username.clone()
        } else {
            name.to_string()
        }
    }
}

/// Signup request fields
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Profile update request fields
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfile {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub new_password: Option<String>,
}

/// Result of a deposit or withdrawal
#[derive(Debug, Clone, Serialize)]
pub struct FundsOutcome {
    pub transaction_id: i64,
    pub new_balance: Decimal,
}

/// SHA-256 digest of the password, lowercase hex
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// At least 8 characters with an uppercase letter, a lowercase letter, a
/// digit, and a character that is none of those
pub fn is_password_strong(password: &str) -> bool {
    password.len() >= 8
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_ascii_alphanumeric())
}

/// AccountService provides account management and funds movements
#[derive(Debug, Clone)]
pub struct AccountService {
    pool: PgPool,
}

impl AccountService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a new user with a never-funded balance
    pub async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let NewUser { first_name, last_name, username, email, password } = new_user;

        if first_name.trim().is_empty()
            || last_name.trim().is_empty()
            || username.trim().is_empty()
            || email.trim().is_empty()
            || password.is_empty()
        {
            return Err(AccountServiceError::MissingFields);
        }

        if !is_password_strong(&password) {
            return Err(AccountServiceError::WeakPassword);
        }

        let username_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(&username)
                .fetch_one(&self.pool)
                .await?;
        if username_taken {
            return Err(AccountServiceError::UsernameTaken);
        }

        let email_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(&email)
                .fetch_one(&self.pool)
                .await?;
        if email_taken {
            return Err(AccountServiceError::EmailTaken);
        }

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (first_name, last_name, username, email, password_hash, balance, created_at)
             VALUES ($1, $2, $3, $4, $5, NULL, $6)
             RETURNING *",
        )
        .bind(&first_name)
        .bind(&last_name)
        .bind(&username)
        .bind(&email)
        .bind(hash_password(&password))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Created user {} ({})", user.username, user.user_id);
        Ok(user)
    }

    /// Authenticate by email or username plus password
    pub async fn authenticate(&self, identifier: &str, password: &str) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE (email = $1 OR username = $1) AND password_hash = $2",
        )
        .bind(identifier)
        .bind(hash_password(password))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AccountServiceError::InvalidCredentials)?;

        Ok(user)
    }

    /// Get a user by id
    pub async fn get_user(&self, user_id: i64) -> Result<User> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AccountServiceError::AccountNotFound { user_id })?;

        Ok(user)
    }

    /// Current cash balance; None means the account was never funded
    pub async fn get_balance(&self, user_id: i64) -> Result<Option<Decimal>> {
        let balance: Option<Decimal> =
            sqlx::query_scalar("SELECT balance FROM users WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(AccountServiceError::AccountNotFound { user_id })?;

        Ok(balance)
    }

    /// Update profile fields, re-checking uniqueness against other accounts
    pub async fn update_profile(&self, user_id: i64, update: UpdateProfile) -> Result<User> {
        let user = self.get_user(user_id).await?;

        if update.username != user.username {
            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND user_id <> $2)",
            )
            .bind(&update.username)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
            if taken {
                return Err(AccountServiceError::UsernameTaken);
            }
        }

        if update.email != user.email {
            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND user_id <> $2)",
            )
            .bind(&update.email)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
            if taken {
                return Err(AccountServiceError::EmailTaken);
            }
        }

        let password_hash = match update.new_password.as_deref() {
            Some(password) if !password.is_empty() => {
                if !is_password_strong(password) {
                    return Err(AccountServiceError::WeakPassword);
                }
                hash_password(password)
            }
            _ => user.password_hash.clone(),
        };

        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET username = $1, first_name = $2, last_name = $3, email = $4, password_hash = $5
             WHERE user_id = $6
             RETURNING *",
        )
        .bind(&update.username)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.email)
        .bind(&password_hash)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Credit the balance and append a deposit entry as one atomic unit
    pub async fn deposit(&self, user_id: i64, amount: Decimal, label: &str) -> Result<FundsOutcome> {
        if amount <= Decimal::ZERO {
            return Err(AccountServiceError::InvalidAmount);
        }

        let mut tx = self.pool.begin().await?;

        let balance: Option<Decimal> =
            sqlx::query_scalar("SELECT balance FROM users WHERE user_id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AccountServiceError::AccountNotFound { user_id })?;

        let new_balance = balance.unwrap_or(Decimal::ZERO) + amount;
        sqlx::query("UPDATE users SET balance = $1 WHERE user_id = $2")
            .bind(new_balance)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let transaction_id = ledger::append_entry(
            &mut *tx,
            &NewLedgerEntry {
                user_id,
                stock_id: None,
                quantity: 1,
                price: amount,
                transaction_type: Some(label.to_string()),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!("Deposited {} for user {}, new balance {}", amount, user_id, new_balance);
        Ok(FundsOutcome { transaction_id, new_balance })
    }

    /// Debit the balance and append a withdrawal entry as one atomic unit
    pub async fn withdraw(
        &self,
        user_id: i64,
        amount: Decimal,
        label: &str,
    ) -> Result<FundsOutcome> {
        if amount <= Decimal::ZERO {
            return Err(AccountServiceError::InvalidAmount);
        }

        let mut tx = self.pool.begin().await?;

        let balance: Option<Decimal> =
            sqlx::query_scalar("SELECT balance FROM users WHERE user_id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AccountServiceError::AccountNotFound { user_id })?;

        let available = balance.unwrap_or(Decimal::ZERO);
        if available < amount {
            return Err(AccountServiceError::InsufficientFunds { required: amount, available });
        }

        let new_balance = available - amount;
        sqlx::query("UPDATE users SET balance = $1 WHERE user_id = $2")
            .bind(new_balance)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let transaction_id = ledger::append_entry(
            &mut *tx,
            &NewLedgerEntry {
                user_id,
                stock_id: None,
                quantity: 1,
                price: -amount,
                transaction_type: Some(label.to_string()),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!("Withdrew {} for user {}, new balance {}", amount, user_id, new_balance);
        Ok(FundsOutcome { transaction_id, new_balance })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_is_hex_sha256() {
        let hash = hash_password("Secret#1");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, hash_password("Secret#1"));
        assert_ne!(hash, hash_password("Secret#2"));
    }

    #[test]
    fn test_password_strength() {
        assert!(is_password_strong("Abcdef1!"));
        assert!(!is_password_strong("abcdef1!")); // no uppercase
        assert!(!is_password_strong("ABCDEF1!")); // no lowercase
        assert!(!is_password_strong("Abcdefg!")); // no digit
        assert!(!is_password_strong("Abcdefg1")); // no special character
        assert!(!is_password_strong("Ab1!")); // too short
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let user = User {
            user_id: 1,
            first_name: "".to_string(),
            last_name: "".to_string(),
            username: "trader1".to_string(),
            email: "t@example.com".to_string(),
            password_hash: String::new(),
            balance: None,
            created_at: Utc::now(),
        };
        assert_eq!(user.display_name(), "trader1");
    }
}
