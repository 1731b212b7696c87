//! HTTP surface.
//!
//! Axum router exposing the trading API under the `/api/trade` prefix.
//! Three authentication tiers, matching the route matrix:
//!
//! | Gate | Routes |
//! |------|--------|
//! | login or signature | `GET /accounts`, `/portfolio/{i}`, `/positions/{i}` |
//! | login only | `POST /trade`, `POST /sell` |
//! | signature only | `POST /outer/trade/...`, cancels, order queries |
//!
//! Every error response is `{"error": message}` with status 400/401/500;
//! success payloads always carry a `message` field. Business failures are
//! not errors: they ride inside the per-session results with HTTP 200.

pub mod auth;
mod handlers;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};

use crate::config::GatewaySettings;
use crate::error::GatewayError;
use crate::pool::SessionPool;

/// Path prefix every API route lives under.
pub const API_PREFIX: &str = "/api/trade";

/// Shared state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// The session registry, fixed for the process lifetime.
    pub pool: Arc<SessionPool>,
    /// Gateway settings.
    pub settings: Arc<GatewaySettings>,
}

impl AppState {
    /// Create the server state.
    #[must_use]
    pub fn new(pool: Arc<SessionPool>, settings: Arc<GatewaySettings>) -> Self {
        Self { pool, settings }
    }
}

fn prefixed(path: &str) -> String {
    format!("{API_PREFIX}{path}")
}

/// Create the router with all endpoints.
#[must_use]
pub fn create_router(state: AppState) -> Router {
    let signed = Router::new()
        .route(&prefixed("/outer/trade/{operation}"), post(handlers::outer_trade))
        .route(
            &prefixed("/outer/trade/batch/{operation}"),
            post(handlers::outer_trade_batch),
        )
        .route(&prefixed("/trade/allin"), post(handlers::trade_allin))
        .route(&prefixed("/trade/nhg"), post(handlers::reverse_repo))
        .route(&prefixed("/cancel_order"), post(handlers::cancel_order))
        .route(&prefixed("/order"), post(handlers::query_order))
        .route(&prefixed("/orders"), post(handlers::query_orders))
        .route(
            &prefixed("/cancel_orders/sale"),
            post(handlers::cancel_orders_sell),
        )
        .route(
            &prefixed("/cancel_orders/buy"),
            post(handlers::cancel_orders_buy),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_signature,
        ));

    let login_only = Router::new()
        .route(&prefixed("/trade"), post(handlers::trade))
        .route(&prefixed("/sell"), post(handlers::sell))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_login,
        ));

    let read = Router::new()
        .route(&prefixed("/accounts"), get(handlers::accounts))
        .route(
            &prefixed("/portfolio/{trader_index}"),
            get(handlers::portfolio),
        )
        .route(
            &prefixed("/positions/{trader_index}"),
            get(handlers::positions),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_login_or_signature,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route(&prefixed("/login"), post(handlers::login))
        .route(&prefixed("/logout"), post(handlers::logout))
        .merge(signed)
        .merge(login_only)
        .merge(read)
        .with_state(state)
}

/// API error: status code plus a `{"error": message}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// 400 with a message.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// 401 with a message.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    /// 500 with a message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidTraderIndex { .. } => Self::bad_request(err.to_string()),
            GatewayError::LinkExhausted { .. } | GatewayError::Broker(_) => {
                Self::internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}
