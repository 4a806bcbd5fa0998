//! HTTP surface: router, shared state, and request handlers.

use std::sync::Arc;

use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::auth::{self, AuthUser};
use crate::api::error::ApiError;
use crate::ledger::{self, SharedLedger};
use crate::market::MarketDataClient;
use crate::types::trade::TradeSide;

#[derive(Clone)]
pub struct AppState {
    pub ledger: SharedLedger,
    pub market: Arc<MarketDataClient>,
    pub jwt_secret: Vec<u8>,
    pub db: Option<PgPool>,
}

/// `Json` wrapper whose rejection is a 400 instead of axum's default 422,
/// so missing and malformed fields report the same way.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::InvalidRequest(rejection.body_text())),
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/users/{user_id}", delete(remove_user))
        .route("/api/account/deposit", post(deposit))
        .route("/api/trades", post(execute_trade))
        .route("/api/positions/{user_id}/{symbol}", get(position))
        .route("/api/portfolio/{user_id}", get(portfolio))
        .route("/api/quote/{symbol}", get(quote))
        .route("/api/search", get(search))
        .with_state(state)
}

async fn health() -> &'static str {
    "healthy"
}

#[derive(Deserialize)]
struct RegisterRequest {
    login: String,
    password: String,
    first_name: String,
    last_name: String,
    email: String,
}

async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.login.trim().is_empty()
        || req.password.is_empty()
        || req.first_name.trim().is_empty()
        || req.last_name.trim().is_empty()
        || req.email.trim().is_empty()
    {
        return Err(ApiError::InvalidRequest(
            "login, password, first name, last name, and email are required".to_string(),
        ));
    }

    let password_hash = auth::hash_password(&req.password).map_err(|_| ApiError::Internal)?;
    let user = ledger::add_user(
        &state.ledger,
        state.db.as_ref(),
        req.login.trim(),
        &password_hash,
        req.first_name.trim(),
        req.last_name.trim(),
        req.email.trim(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "user created successfully", "user_id": user.id })),
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    login: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.login.is_empty() || req.password.is_empty() {
        return Err(ApiError::InvalidRequest(
            "login and password required".to_string(),
        ));
    }

    // Same 401 for unknown login and wrong password.
    let user = ledger::find_by_login(&state.ledger, &req.login)
        .await
        .ok_or(ApiError::Unauthorized)?;
    if !auth::verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    let token = auth::create_token(&state.jwt_secret, user.id).map_err(|_| ApiError::Internal)?;
    Ok(Json(json!({
        "message": "login successful",
        "token": token,
        "user_id": user.id,
        "first_name": user.first_name,
        "last_name": user.last_name,
        "cash_balance": user.cash_balance,
    })))
}

async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user = ledger::get_user(&state.ledger, auth_user.user_id)
        .await
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    Ok(Json(json!({
        "user_id": user.id,
        "login": user.login,
        "first_name": user.first_name,
        "last_name": user.last_name,
        "email": user.email,
        "cash_balance": user.cash_balance,
    })))
}

async fn remove_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    ledger::remove_user(&state.ledger, state.db.as_ref(), user_id).await?;
    Ok(Json(
        json!({ "message": "user and associated positions deleted" }),
    ))
}

#[derive(Deserialize)]
struct DepositRequest {
    user_id: Uuid,
    amount: Decimal,
}

async fn deposit(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<DepositRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new_balance =
        ledger::deposit_funds(&state.ledger, state.db.as_ref(), req.user_id, req.amount).await?;
    Ok(Json(
        json!({ "message": "balance updated", "new_balance": new_balance }),
    ))
}

#[derive(Deserialize)]
struct TradeRequest {
    user_id: Uuid,
    symbol: String,
    action: TradeSide,
    units: Decimal,
    price: Decimal,
}

async fn execute_trade(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TradeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.symbol.trim().is_empty() {
        return Err(ApiError::InvalidRequest("symbol is required".to_string()));
    }

    let (position, cash_balance) = ledger::apply_trade(
        &state.ledger,
        state.db.as_ref(),
        req.user_id,
        req.symbol.trim(),
        req.action,
        req.units,
        req.price,
    )
    .await?;

    Ok(Json(json!({
        "message": "position updated",
        "position": position,
        "cash_balance": cash_balance,
    })))
}

async fn position(
    State(state): State<AppState>,
    Path((user_id, symbol)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let position = ledger::get_position(&state.ledger, user_id, &symbol).await?;
    Ok(Json(position))
}

#[derive(Deserialize)]
struct PortfolioQuery {
    symbol: Option<String>,
}

async fn portfolio(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<PortfolioQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let positions =
        ledger::get_portfolio(&state.ledger, user_id, query.symbol.as_deref()).await?;
    Ok(Json(positions))
}

async fn quote(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let quote = state.market.get_quote(&symbol).await?;
    Ok(Json(quote))
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let matches = state.market.search_symbols(&query.q).await?;
    Ok(Json(matches))
}
