//! Session tokens and the authentication filter
//!
//! The original session cookie is replaced with a signed bearer token; the
//! filter resolves it to a user id before any core operation runs.

use crate::error::failure_reply;
use crate::{GatewayError, Result};
use account_service::User;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::Filter;

/// Token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i64,
    pub email: String,
    pub exp: usize,
}

/// The authenticated caller extracted from a request
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i64,
}

/// Issue a token for a freshly authenticated user
pub fn create_token(user: &User, secret: &str, ttl_hours: i64) -> Result<String> {
    let exp = chrono::Utc::now() + chrono::Duration::hours(ttl_hours);
    let claims = Claims { sub: user.user_id, email: user.email.clone(), exp: exp.timestamp() as usize };

    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))?;
    Ok(token)
}

/// Verify a token and return its claims
pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[derive(Debug)]
struct Unauthenticated;

impl warp::reject::Reject for Unauthenticated {}

/// Filter that resolves the Authorization header to an AuthUser
pub fn with_auth(
    secret: Arc<String>,
) -> impl Filter<Extract = (AuthUser,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let secret = secret.clone();
        async move {
            let token = header
                .as_deref()
                .and_then(|h| h.strip_prefix("Bearer "))
                .ok_or_else(|| warp::reject::custom(Unauthenticated))?;

            match verify_token(token, &secret) {
                Ok(claims) => Ok(AuthUser { user_id: claims.sub }),
                Err(_) => Err(warp::reject::custom(Unauthenticated)),
            }
        }
    })
}

/// Map auth rejections (and anything else unhandled) to envelope replies
pub async fn handle_rejection(
    err: warp::Rejection,
) -> std::result::Result<impl warp::Reply, warp::Rejection> {
    if err.find::<Unauthenticated>().is_some() {
        return Ok(failure_reply(GatewayError::Account(
            account_service::AccountServiceError::Unauthenticated,
        )));
    }

    if err.is_not_found() {
        return Ok(warp::reply::with_status(
            warp::reply::json(&serde_json::json!({
                "success": false,
                "message": "Not found",
            })),
            warp::http::StatusCode::NOT_FOUND,
        ));
    }

    if err.find::<warp::filters::body::BodyDeserializeError>().is_some() {
        return Ok(warp::reply::with_status(
            warp::reply::json(&serde_json::json!({
                "success": false,
                "message": "Invalid request body",
            })),
            warp::http::StatusCode::BAD_REQUEST,
        ));
    }

    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user() -> User {
        User {
            user_id: 42,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: String::new(),
            balance: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let token = create_token(&user(), "secret", 24).unwrap();
        let claims = verify_token(&token, "secret").unwrap();

        assert_eq!(claims.sub, 42);
        assert_eq!(claims.email, "ada@example.com");
    }

    #[test]
    fn test_token_rejects_wrong_secret() {
        let token = create_token(&user(), "secret", 24).unwrap();
        assert!(verify_token(&token, "other-secret").is_err());
    }

    #[tokio::test]
    async fn test_with_auth_rejects_missing_header() {
        let filter = with_auth(Arc::new("secret".to_string()));
        let result = warp::test::request().filter(&filter).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_with_auth_accepts_bearer_token() {
        let token = create_token(&user(), "secret", 24).unwrap();
        let filter = with_auth(Arc::new("secret".to_string()));

        let auth_user = warp::test::request()
            .header("authorization", format!("Bearer {token}"))
            .filter(&filter)
            .await
            .unwrap();
        assert_eq!(auth_user.user_id, 42);
    }
}
