//! REST API endpoints for the TradeGateway
//!
//! This module provides the JSON endpoints for authentication, quotes, the
//! stock list, trade execution, portfolio data, deposits/withdrawals, and
//! admin dashboard data.

use crate::admin::AdminService;
use crate::auth::{self, AuthUser};
use crate::config::AuthConfig;
use crate::error::failure_reply;
use crate::payment::PaymentService;
use crate::{GatewayError, Result};
use account_service::settlement::TradeRequest;
use account_service::{
    AccountService, Ledger, NewUser, PortfolioService, SettlementService, TradeSide, UpdateProfile,
    User,
};
use chrono::{DateTime, Utc};
use market_data::{MarketDataService, Quote, Stock, StockStore};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;
use warp::{Filter, Reply};

/// Shared state handed to every handler
pub struct AppState {
    pub accounts: AccountService,
    pub ledger: Ledger,
    pub portfolio: PortfolioService,
    pub settlement: SettlementService,
    pub market: Arc<MarketDataService>,
    pub stocks: StockStore,
    pub payments: PaymentService,
    pub admin: AdminService,
    pub pool: PgPool,
    pub auth: AuthConfig,
}

// ---------------------------------------------------------------------------
// Request / response payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email or username
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct TradeApiRequest {
    pub symbol: Option<String>,
    pub stock_id: Option<i64>,
    pub quantity: i32,
    /// "buy" or "sell"
    pub side: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeResponse {
    pub success: bool,
    pub message: String,
    pub new_balance: Decimal,
    pub transaction_id: i64,
    pub total_shares: i64,
}

#[derive(Debug, Deserialize)]
pub struct StockListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub sector: Option<String>,
    /// "gainers" or "losers"
    pub market: Option<String>,
}

/// One stock row as the list and movers endpoints render it
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockView {
    pub stock_id: i64,
    pub symbol: String,
    pub company_name: String,
    pub sector: Option<String>,
    pub price: Decimal,
    pub change: String,
    pub change_percent: Decimal,
    pub is_available: bool,
    pub last_updated: DateTime<Utc>,
}

impl StockView {
    fn from_stock(stock: &Stock) -> Self {
        let change_percent = stock.change_percent().unwrap_or(Decimal::ZERO);
        Self {
            stock_id: stock.stock_id,
            symbol: stock.symbol.clone(),
            company_name: stock.company_name.clone(),
            sector: stock.sector.clone(),
            price: stock.market_price,
            change: signed_percent(change_percent),
            change_percent,
            is_available: stock.is_available,
            last_updated: stock.last_updated,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub success: bool,
    pub symbol: String,
    pub price: Decimal,
    pub open_price: Option<Decimal>,
    pub open_price_time: Option<DateTime<Utc>>,
    pub change: String,
    pub is_available: bool,
    pub source: market_data::QuoteSource,
}

impl QuoteResponse {
    fn from_quote(quote: Quote) -> Self {
        let change = quote
            .open_price
            .filter(|open| *open > Decimal::ZERO)
            .map(|open| signed_percent((quote.price - open) / open * Decimal::from(100)))
            .unwrap_or_else(|| "+0.00%".to_string());

        Self {
            success: true,
            symbol: quote.symbol,
            price: quote.price,
            open_price: quote.open_price,
            open_price_time: quote.open_price_time,
            change,
            is_available: quote.is_available,
            source: quote.source,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CompleteDepositRequest {
    pub session_ref: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub amount: Decimal,
    pub destination: String,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub is_available: bool,
}

/// Percentage with an explicit sign, e.g. "+5.42%" / "-2.13%"
fn signed_percent(value: Decimal) -> String {
    if value >= Decimal::ZERO {
        format!("+{:.2}%", value)
    } else {
        format!("{:.2}%", value)
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn signup(state: Arc<AppState>, request: SignupRequest) -> Result<AuthResponse> {
    let user = state
        .accounts
        .create_user(NewUser {
            first_name: request.first_name,
            last_name: request.last_name,
            username: request.username,
            email: request.email,
            password: request.password,
        })
        .await?;

    let token = auth::create_token(&user, &state.auth.jwt_secret, state.auth.token_ttl_hours)?;
    Ok(AuthResponse { success: true, token, user })
}

async fn login(state: Arc<AppState>, request: LoginRequest) -> Result<AuthResponse> {
    let user = state.accounts.authenticate(&request.username, &request.password).await?;
    let token = auth::create_token(&user, &state.auth.jwt_secret, state.auth.token_ttl_hours)?;
    Ok(AuthResponse { success: true, token, user })
}

async fn update_profile(
    caller: AuthUser,
    state: Arc<AppState>,
    request: UpdateProfileRequest,
) -> Result<serde_json::Value> {
    let user = state
        .accounts
        .update_profile(
            caller.user_id,
            UpdateProfile {
                username: request.username,
                first_name: request.first_name,
                last_name: request.last_name,
                email: request.email,
                new_password: request.new_password,
            },
        )
        .await?;

    Ok(serde_json::json!({
        "success": true,
        "message": "Profile updated successfully.",
        "username": user.username,
        "email": user.email,
    }))
}

async fn get_quote(symbol: String, state: Arc<AppState>) -> QuoteResponse {
    QuoteResponse::from_quote(state.market.get_quote(&symbol).await)
}

async fn list_stocks(params: StockListParams, state: Arc<AppState>) -> Result<serde_json::Value> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(10).max(1);

    let (views, total) = match params.market.as_deref() {
        Some(market) => {
            // Gainers/losers filter needs the daily change, so page in memory
            let all = state.stocks.list_all().await?;
            let mut views: Vec<StockView> = all.iter().map(StockView::from_stock).collect();
            match market {
                "gainers" => views.retain(|v| v.change_percent > Decimal::ZERO),
                "losers" => views.retain(|v| v.change_percent < Decimal::ZERO),
                _ => {}
            }
            if let Some(sector) = params.sector.as_deref() {
                views.retain(|v| v.sector.as_deref() == Some(sector));
            }
            let total = views.len() as i64;
            let start = ((page - 1) * page_size) as usize;
            let views: Vec<StockView> =
                views.into_iter().skip(start).take(page_size as usize).collect();
            (views, total)
        }
        None => {
            let (stocks, total) =
                state.stocks.list_page(page, page_size, params.sector.as_deref()).await?;
            (stocks.iter().map(StockView::from_stock).collect(), total)
        }
    };

    let total_pages = (total + page_size - 1) / page_size;
    Ok(serde_json::json!({
        "success": true,
        "stocks": views,
        "page": page,
        "pageSize": page_size,
        "totalItems": total,
        "totalPages": total_pages,
    }))
}

async fn market_movers(state: Arc<AppState>) -> Result<serde_json::Value> {
    let all = state.stocks.list_all().await?;
    let mut views: Vec<StockView> = all.iter().map(StockView::from_stock).collect();

    views.sort_by(|a, b| b.change_percent.cmp(&a.change_percent));
    let gainers: Vec<&StockView> = views.iter().take(5).collect();
    let losers: Vec<&StockView> = views.iter().rev().take(5).collect();

    Ok(serde_json::json!({
        "success": true,
        "gainers": gainers,
        "losers": losers,
    }))
}

async fn execute_trade(
    caller: AuthUser,
    state: Arc<AppState>,
    request: TradeApiRequest,
) -> Result<TradeResponse> {
    let side: TradeSide = request.side.parse().map_err(GatewayError::Account)?;

    let outcome = state
        .settlement
        .execute_trade(TradeRequest {
            user_id: caller.user_id,
            stock_id: request.stock_id,
            symbol: request.symbol,
            quantity: request.quantity,
            side,
        })
        .await?;

    let action = match outcome.side {
        TradeSide::Buy => "purchased",
        TradeSide::Sell => "sold",
    };
    let message = format!(
        "You have {} {} shares of {} for ${:.2}. Your new balance is ${:.2}.",
        action, outcome.quantity, outcome.symbol, outcome.total_amount, outcome.new_balance
    );

    Ok(TradeResponse {
        success: true,
        message,
        new_balance: outcome.new_balance,
        transaction_id: outcome.transaction_id,
        total_shares: outcome.total_shares,
    })
}

async fn get_portfolio(
    caller: AuthUser,
    params: PageParams,
    state: Arc<AppState>,
) -> Result<serde_json::Value> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(5).max(1);

    let user = state.accounts.get_user(caller.user_id).await?;
    let holdings = state.portfolio.holdings(caller.user_id).await?;
    let stats = state.portfolio.stats(caller.user_id).await?;
    let (transactions, total_transactions) =
        state.ledger.entries_page(caller.user_id, page, page_size).await?;

    let total_pages = (total_transactions + page_size - 1) / page_size;
    Ok(serde_json::json!({
        "success": true,
        "user": user,
        "holdings": holdings,
        "stats": stats,
        "transactions": transactions,
        "page": page,
        "pageSize": page_size,
        "totalPages": total_pages,
    }))
}

async fn refresh_portfolio_prices(
    caller: AuthUser,
    state: Arc<AppState>,
) -> Result<serde_json::Value> {
    let held = state.portfolio.held_stocks(caller.user_id).await?;
    let mut updated = Vec::new();

    for stock in held {
        match state.market.refresh_symbol(&stock.symbol).await {
            Ok(quote) => updated.push(serde_json::json!({
                "stockId": stock.stock_id,
                "symbol": quote.symbol,
                "price": quote.price,
                "lastUpdated": Utc::now(),
            })),
            Err(e) => {
                tracing::warn!("Failed to update stock price for {}: {}", stock.symbol, e);
            }
        }
    }

    Ok(serde_json::json!({
        "success": true,
        "updatedStocks": updated,
    }))
}

async fn transaction_receipt(
    caller: AuthUser,
    transaction_id: i64,
    state: Arc<AppState>,
) -> Result<serde_json::Value> {
    let user = state.accounts.get_user(caller.user_id).await?;
    let entry = state
        .ledger
        .entry_for_user(caller.user_id, transaction_id)
        .await?
        .ok_or(GatewayError::TransactionNotFound)?;

    let stock = match entry.stock_id {
        Some(stock_id) => state.stocks.get_by_id(stock_id).await?,
        None => None,
    };

    let transaction_type = match (&entry.stock_id, entry.price) {
        (None, price) if price > Decimal::ZERO => "Add Funds",
        (None, price) if price < Decimal::ZERO => "Payout",
        (None, _) => "Funds",
        (Some(_), price) if price >= Decimal::ZERO => "Buy",
        (Some(_), _) => "Sell",
    };
    let stock_name = stock
        .map(|s| s.company_name)
        .unwrap_or_else(|| transaction_type.to_string());

    let price_per_unit = entry.price.abs();
    let total_amount = (entry.price * Decimal::from(entry.quantity)).abs();

    Ok(serde_json::json!({
        "success": true,
        "receiptNo": entry.transaction_id,
        "customerName": user.display_name(),
        "username": user.username,
        "email": user.email,
        "transactionType": transaction_type,
        "stockName": stock_name,
        "quantity": entry.quantity,
        "pricePerUnit": price_per_unit,
        "totalAmount": total_amount,
        "issued": entry.transaction_time,
    }))
}

async fn create_deposit(
    caller: AuthUser,
    state: Arc<AppState>,
    request: AmountRequest,
) -> Result<serde_json::Value> {
    let user = state.accounts.get_user(caller.user_id).await?;
    let description =
        format!("Add ${:.2} to account balance for {}", request.amount, user.email);
    let session = state.payments.create_deposit(request.amount, &description)?;

    Ok(serde_json::json!({
        "success": true,
        "sessionRef": session.session_ref,
        "amount": session.amount,
        "description": session.description,
    }))
}

async fn complete_deposit(
    caller: AuthUser,
    state: Arc<AppState>,
    request: CompleteDepositRequest,
) -> Result<serde_json::Value> {
    let session = state.payments.take_session(request.session_ref)?;
    let outcome = state.accounts.deposit(caller.user_id, session.amount, "Add Funds").await?;

    Ok(serde_json::json!({
        "success": true,
        "message": format!(
            "Added ${:.2} to your balance. Your new balance is ${:.2}.",
            session.amount, outcome.new_balance
        ),
        "newBalance": outcome.new_balance,
        "transactionId": outcome.transaction_id,
    }))
}

async fn withdraw(
    caller: AuthUser,
    state: Arc<AppState>,
    request: WithdrawRequest,
) -> Result<serde_json::Value> {
    if request.destination.trim().is_empty() {
        return Err(GatewayError::InvalidPayoutDestination);
    }

    let outcome = state.accounts.withdraw(caller.user_id, request.amount, "Payout").await?;
    let receipt = state.payments.simulate_payout(request.amount, &request.destination)?;

    Ok(serde_json::json!({
        "success": true,
        "message": format!(
            "Withdrew ${:.2}. Your new balance is ${:.2}.",
            request.amount, outcome.new_balance
        ),
        "newBalance": outcome.new_balance,
        "transactionId": outcome.transaction_id,
        "payoutRef": receipt.payout_ref,
    }))
}

async fn admin_dashboard(_caller: AuthUser, state: Arc<AppState>) -> Result<serde_json::Value> {
    let stats = state.admin.dashboard().await?;
    Ok(serde_json::json!({
        "success": true,
        "dashboard": stats,
    }))
}

async fn set_stock_availability(
    _caller: AuthUser,
    stock_id: i64,
    state: Arc<AppState>,
    request: AvailabilityRequest,
) -> Result<serde_json::Value> {
    let updated = state.stocks.set_availability(stock_id, request.is_available).await?;
    if !updated {
        return Err(GatewayError::Account(
            account_service::AccountServiceError::StockNotFound {
                reference: stock_id.to_string(),
            },
        ));
    }

    Ok(serde_json::json!({
        "success": true,
        "stockId": stock_id,
        "isAvailable": request.is_available,
    }))
}

async fn health(state: Arc<AppState>) -> Result<serde_json::Value> {
    sqlx::query("SELECT 1").execute(&state.pool).await?;
    Ok(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Collapse a handler result into a reply: success JSON or failure envelope
fn reply_of<T: Serialize>(result: Result<T>) -> warp::reply::Response {
    match result {
        Ok(value) => warp::reply::json(&value).into_response(),
        Err(err) => failure_reply(err).into_response(),
    }
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// Assemble the full route tree
pub fn create_routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let with_state = {
        let state = state.clone();
        warp::any().map(move || state.clone())
    };
    let secret = Arc::new(state.auth.jwt_secret.clone());
    let authed = auth::with_auth(secret);

    let signup_route = warp::path!("api" / "auth" / "signup")
        .and(warp::post())
        .and(with_state.clone())
        .and(warp::body::json())
        .then(|state, request| async move { reply_of(signup(state, request).await) });

    let login_route = warp::path!("api" / "auth" / "login")
        .and(warp::post())
        .and(with_state.clone())
        .and(warp::body::json())
        .then(|state, request| async move { reply_of(login(state, request).await) });

    let profile_update_route = warp::path!("api" / "account" / "profile")
        .and(warp::post())
        .and(authed.clone())
        .and(with_state.clone())
        .and(warp::body::json())
        .then(|caller, state, request| async move {
            reply_of(update_profile(caller, state, request).await)
        });

    let quote_route = warp::path!("api" / "quote" / String)
        .and(warp::get())
        .and(with_state.clone())
        .then(|symbol, state| async move {
            warp::reply::json(&get_quote(symbol, state).await).into_response()
        });

    let stocks_route = warp::path!("api" / "stocks")
        .and(warp::get())
        .and(warp::query::<StockListParams>())
        .and(with_state.clone())
        .then(|params, state| async move { reply_of(list_stocks(params, state).await) });

    let movers_route = warp::path!("api" / "stocks" / "movers")
        .and(warp::get())
        .and(with_state.clone())
        .then(|state| async move { reply_of(market_movers(state).await) });

    let trade_route = warp::path!("api" / "trade")
        .and(warp::post())
        .and(authed.clone())
        .and(with_state.clone())
        .and(warp::body::json())
        .then(|caller, state, request| async move {
            reply_of(execute_trade(caller, state, request).await)
        });

    let portfolio_route = warp::path!("api" / "portfolio")
        .and(warp::get())
        .and(authed.clone())
        .and(warp::query::<PageParams>())
        .and(with_state.clone())
        .then(|caller, params, state| async move {
            reply_of(get_portfolio(caller, params, state).await)
        });

    let refresh_route = warp::path!("api" / "portfolio" / "refresh")
        .and(warp::post())
        .and(authed.clone())
        .and(with_state.clone())
        .then(|caller, state| async move {
            reply_of(refresh_portfolio_prices(caller, state).await)
        });

    let receipt_route = warp::path!("api" / "transactions" / i64 / "receipt")
        .and(warp::get())
        .and(authed.clone())
        .and(with_state.clone())
        .then(|transaction_id, caller, state| async move {
            reply_of(transaction_receipt(caller, transaction_id, state).await)
        });

    let deposit_route = warp::path!("api" / "payments" / "deposit")
        .and(warp::post())
        .and(authed.clone())
        .and(with_state.clone())
        .and(warp::body::json())
        .then(|caller, state, request| async move {
            reply_of(create_deposit(caller, state, request).await)
        });

    let deposit_complete_route = warp::path!("api" / "payments" / "deposit" / "complete")
        .and(warp::post())
        .and(authed.clone())
        .and(with_state.clone())
        .and(warp::body::json())
        .then(|caller, state, request| async move {
            reply_of(complete_deposit(caller, state, request).await)
        });

    let withdraw_route = warp::path!("api" / "payments" / "withdraw")
        .and(warp::post())
        .and(authed.clone())
        .and(with_state.clone())
        .and(warp::body::json())
        .then(|caller, state, request| async move {
            reply_of(withdraw(caller, state, request).await)
        });

    let admin_dashboard_route = warp::path!("api" / "admin" / "dashboard")
        .and(warp::get())
        .and(authed.clone())
        .and(with_state.clone())
        .then(|caller, state| async move { reply_of(admin_dashboard(caller, state).await) });

    let availability_route = warp::path!("api" / "admin" / "stocks" / i64 / "availability")
        .and(warp::post())
        .and(authed)
        .and(with_state.clone())
        .and(warp::body::json())
        .then(|stock_id, caller, state, request| async move {
            reply_of(set_stock_availability(caller, stock_id, state, request).await)
        });

    let health_route = warp::path!("health")
        .and(warp::get())
        .and(with_state)
        .then(|state| async move { reply_of(health(state).await) });

    signup_route
        .or(login_route)
        .or(profile_update_route)
        .or(quote_route)
        .or(movers_route)
        .or(stocks_route)
        .or(trade_route)
        .or(refresh_route)
        .or(portfolio_route)
        .or(receipt_route)
        .or(deposit_complete_route)
        .or(deposit_route)
        .or(withdraw_route)
        .or(admin_dashboard_route)
        .or(availability_route)
        .or(health_route)
        .recover(auth::handle_rejection)
        .with(
            warp::cors()
                .allow_any_origin()
                .allow_headers(vec!["content-type", "authorization"])
                .allow_methods(vec!["GET", "POST", "OPTIONS"]),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_percent() {
        assert_eq!(signed_percent(Decimal::new(542, 2)), "+5.42%");
        assert_eq!(signed_percent(Decimal::new(-213, 2)), "-2.13%");
        assert_eq!(signed_percent(Decimal::ZERO), "+0.00%");
    }

    #[test]
    fn test_stock_view_change_formatting() {
        let stock = Stock {
            stock_id: 1,
            symbol: "TSLA".to_string(),
            company_name: "Tesla Inc.".to_string(),
            sector: Some("Automotive".to_string()),
            market_price: Decimal::new(11000, 2),
            open_price: Some(Decimal::new(10000, 2)),
            open_price_time: Some(Utc::now()),
            last_updated: Utc::now(),
            is_available: true,
        };
        let view = StockView::from_stock(&stock);

        assert_eq!(view.change, "+10.00%");
        assert_eq!(view.change_percent, Decimal::from(10));
    }

    #[test]
    fn test_stock_view_without_open_price() {
        let stock = Stock {
            stock_id: 1,
            symbol: "TSLA".to_string(),
            company_name: "Tesla Inc.".to_string(),
            sector: None,
            market_price: Decimal::new(11000, 2),
            open_price: None,
            open_price_time: None,
            last_updated: Utc::now(),
            is_available: true,
        };
        let view = StockView::from_stock(&stock);
        assert_eq!(view.change, "+0.00%");
    }
}
