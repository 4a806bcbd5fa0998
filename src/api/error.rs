//! API error taxonomy and its HTTP mapping. Handlers funnel every failure
//! through `ApiError`, which renders as an `{"error": "..."}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::ledger::LedgerError;
use crate::market::MarketError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("invalid login or password")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("not enough units to sell")]
    InsufficientHoldings,
    #[error("market data provider unavailable")]
    UpstreamUnavailable,
    #[error("server error")]
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_)
            | ApiError::InsufficientFunds
            | ApiError::InsufficientHoldings => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidRequest(msg) => ApiError::InvalidRequest(msg.to_string()),
            LedgerError::UserNotFound => ApiError::NotFound(err.to_string()),
            LedgerError::InsufficientFunds => ApiError::InsufficientFunds,
            LedgerError::InsufficientHoldings => ApiError::InsufficientHoldings,
            LedgerError::DuplicateLogin | LedgerError::DuplicateEmail => {
                ApiError::Conflict(err.to_string())
            }
            LedgerError::Persistence(e) => {
                error!("persistence failure: {e}");
                ApiError::Internal
            }
        }
    }
}

impl From<MarketError> for ApiError {
    fn from(err: MarketError) -> Self {
        match err {
            MarketError::SymbolNotFound(_) => ApiError::NotFound(err.to_string()),
            MarketError::Upstream(msg) => {
                error!("market data failure: {msg}");
                ApiError::UpstreamUnavailable
            }
        }
    }
}
