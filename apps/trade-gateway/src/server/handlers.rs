//! Route handlers.
//!
//! Handlers validate the request, select the target session(s) through the
//! pool, run the operation under each session's mutex, and collect
//! per-session outcomes. A session fault becomes that session's `failed`
//! entry; it never aborts the sweep.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::OrderSide;
use crate::pool::SessionOutcome;

use super::{auth, ApiError, AppState};

type Body<T> = Result<Json<T>, JsonRejection>;

fn require<T>(payload: Body<T>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|_| ApiError::bad_request("request body required"))
}

/// Health probe.
pub(super) async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct LoginRequest {
    username: String,
    password: String,
}

/// Browser login; issues the signed session cookie.
pub(super) async fn login(
    State(state): State<AppState>,
    payload: Body<LoginRequest>,
) -> Result<Response, ApiError> {
    let req = require(payload)?;
    let auth_cfg = &state.settings.auth;
    if auth_cfg.secret_key.is_empty() || auth_cfg.users.get(&req.username) != Some(&req.password)
    {
        tracing::warn!(username = %req.username, "login refused");
        return Err(ApiError::unauthorized("invalid username or password"));
    }

    let ttl_secs = auth_cfg.session_ttl_days * 86_400;
    let expires_at = Utc::now().timestamp() + ttl_secs;
    let value = auth::issue_session_cookie(&auth_cfg.secret_key, &req.username, expires_at);
    let cookie = format!(
        "{}={value}; Path=/; HttpOnly; Max-Age={ttl_secs}",
        auth::SESSION_COOKIE
    );
    tracing::info!(username = %req.username, "login ok");

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "message": "login ok", "username": req.username })),
    )
        .into_response())
}

/// Clear the session cookie.
pub(super) async fn logout() -> impl IntoResponse {
    let cookie = format!("{}=; Path=/; HttpOnly; Max-Age=0", auth::SESSION_COOKIE);
    (
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "message": "logged out" })),
    )
}

/// List configured accounts with their pool indices.
pub(super) async fn accounts(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "ok",
        "accounts": state.pool.accounts(),
    }))
}

/// Account snapshot for one session.
pub(super) async fn portfolio(
    State(state): State<AppState>,
    Path(trader_index): Path<usize>,
) -> Result<Json<Value>, ApiError> {
    tracing::info!(trader_index, "portfolio requested");
    let slot = state.pool.get(trader_index)?;
    let mut session = slot.session.lock().await;
    let portfolio = session.portfolio().await?;
    Ok(Json(json!({ "message": "ok", "portfolio": portfolio })))
}

/// Enriched position rows for one session.
pub(super) async fn positions(
    State(state): State<AppState>,
    Path(trader_index): Path<usize>,
) -> Result<Json<Value>, ApiError> {
    tracing::info!(trader_index, "positions requested");
    let slot = state.pool.get(trader_index)?;
    let mut session = slot.session.lock().await;
    let rows = session.position_report().await?;
    tracing::info!(trader_index, count = rows.len(), "positions fetched");
    Ok(Json(json!({ "message": "ok", "positions": rows })))
}

#[derive(Debug, Deserialize)]
pub(super) struct TradeRequest {
    symbol: Option<String>,
    trade_price: Option<Decimal>,
    position_pct: Option<Decimal>,
    #[serde(default)]
    pricetype: Option<u8>,
}

/// Browser trade: percentage-of-equity buy, broadcast to all sessions.
pub(super) async fn trade(
    State(state): State<AppState>,
    payload: Body<TradeRequest>,
) -> Result<Json<Value>, ApiError> {
    let req = require(payload)?;
    let (Some(symbol), Some(price), Some(pct)) =
        (req.symbol, req.trade_price, req.position_pct)
    else {
        return Err(ApiError::bad_request(
            "missing required fields: symbol, trade_price, position_pct",
        ));
    };
    let price_type = req.pricetype.unwrap_or(0);
    tracing::info!(symbol = %symbol, price = %price, pct = %pct, "broadcast buy");

    let mut results = Vec::new();
    for slot in state.pool.all() {
        let mut session = slot.session.lock().await;
        let outcome = session
            .buy_target_pct(&symbol, price, pct, price_type)
            .await;
        results.push(SessionOutcome::success(slot.index, outcome));
    }

    Ok(Json(json!({
        "message": "trade dispatched to all sessions",
        "results": results,
    })))
}

#[derive(Debug, Deserialize)]
pub(super) struct SellRequest {
    symbol: Option<String>,
    price: Option<Decimal>,
    shares: Option<i64>,
}

/// Browser sell: absolute shares, broadcast to all sessions.
pub(super) async fn sell(
    State(state): State<AppState>,
    payload: Body<SellRequest>,
) -> Result<Json<Value>, ApiError> {
    let req = require(payload)?;
    let (Some(symbol), Some(price), Some(shares)) = (req.symbol, req.price, req.shares) else {
        return Err(ApiError::bad_request(
            "missing required fields: symbol, price, shares",
        ));
    };
    tracing::info!(symbol = %symbol, price = %price, shares, "broadcast sell");

    let mut results = Vec::new();
    for slot in state.pool.all() {
        let mut session = slot.session.lock().await;
        let result = session.sell_shares(&symbol, price, Some(shares), 0).await;
        results.push(SessionOutcome::from_result(slot.index, result));
    }

    Ok(Json(json!({
        "message": "sell dispatched to all sessions",
        "results": results,
    })))
}

#[derive(Debug, Deserialize)]
pub(super) struct OuterTradeRequest {
    trader_index: Option<usize>,
    symbol: Option<String>,
    trade_price: Option<Decimal>,
    position_pct: Option<Decimal>,
    #[serde(default)]
    price_type: Option<u8>,
    #[serde(default)]
    strategy_name: Option<String>,
}

/// Signed trade for one session, or all when `trader_index` is omitted.
pub(super) async fn outer_trade(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    payload: Body<OuterTradeRequest>,
) -> Result<Json<Value>, ApiError> {
    let req = require(payload)?;
    let target = req.trader_index;
    run_outer(&state, &operation, req, target).await
}

/// Signed batch trade; always broadcasts.
pub(super) async fn outer_trade_batch(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    payload: Body<OuterTradeRequest>,
) -> Result<Json<Value>, ApiError> {
    let req = require(payload)?;
    run_outer(&state, &operation, req, None).await
}

async fn run_outer(
    state: &AppState,
    operation: &str,
    req: OuterTradeRequest,
    target: Option<usize>,
) -> Result<Json<Value>, ApiError> {
    if operation != "buy" && operation != "sell" {
        return Err(ApiError::bad_request("operation must be buy or sell"));
    }
    let (Some(symbol), Some(price), Some(pct)) =
        (req.symbol, req.trade_price, req.position_pct)
    else {
        return Err(ApiError::bad_request(
            "missing required fields: symbol, trade_price, position_pct",
        ));
    };
    let price_type = req.price_type.unwrap_or(0);
    let strategy_name = req
        .strategy_name
        .unwrap_or_else(|| "external".to_string());

    let slots = state.pool.one_or_all(target)?;
    tracing::info!(
        operation,
        symbol = %symbol,
        price = %price,
        pct = %pct,
        strategy_name = %strategy_name,
        sessions = slots.len(),
        "outer trade"
    );

    let mut results = Vec::new();
    for slot in slots {
        let mut session = slot.session.lock().await;
        let result = if operation == "buy" {
            Ok(session
                .buy_target_pct(&symbol, price, pct, price_type)
                .await)
        } else {
            session
                .sell_target_pct(&symbol, price, pct, price_type)
                .await
        };
        results.push(SessionOutcome::from_result(slot.index, result));
    }

    Ok(Json(json!({
        "message": format!("outer {operation} dispatched"),
        "operation": operation,
        "strategy_name": strategy_name,
        "results": results,
    })))
}

#[derive(Debug, Deserialize)]
pub(super) struct AllInRequest {
    symbol: Option<String>,
    cur_price: Option<Decimal>,
    trader_index: Option<usize>,
}

/// All-in buy for one or all sessions.
pub(super) async fn trade_allin(
    State(state): State<AppState>,
    payload: Body<AllInRequest>,
) -> Result<Json<Value>, ApiError> {
    let req = require(payload)?;
    let (Some(symbol), Some(price)) = (req.symbol, req.cur_price) else {
        return Err(ApiError::bad_request(
            "missing required fields: symbol, cur_price",
        ));
    };

    let slots = state.pool.one_or_all(req.trader_index)?;
    let mut results = Vec::new();
    for slot in slots {
        let mut session = slot.session.lock().await;
        let outcome = session.buy_all_in(&symbol, price).await;
        results.push(SessionOutcome::success(slot.index, outcome));
    }

    Ok(Json(json!({
        "message": "all-in buy dispatched",
        "results": results,
    })))
}

#[derive(Debug, Deserialize)]
pub(super) struct TraderIndexRequest {
    trader_index: Option<usize>,
}

/// Sweep idle cash into the overnight reverse repo.
pub(super) async fn reverse_repo(
    State(state): State<AppState>,
    payload: Body<TraderIndexRequest>,
) -> Result<Json<Value>, ApiError> {
    let req = require(payload)?;
    let slots = state.pool.one_or_all(req.trader_index)?;

    let mut results = Vec::new();
    for slot in slots {
        let mut session = slot.session.lock().await;
        let result = session.reverse_repo().await;
        results.push(SessionOutcome::from_result(slot.index, result));
    }

    Ok(Json(json!({
        "message": "reverse repo dispatched",
        "results": results,
    })))
}

#[derive(Debug, Deserialize)]
pub(super) struct OrderActionRequest {
    order_id: Option<i64>,
    trader_index: Option<usize>,
}

/// Cancel one order on one session.
pub(super) async fn cancel_order(
    State(state): State<AppState>,
    payload: Body<OrderActionRequest>,
) -> Result<Json<Value>, ApiError> {
    let req = require(payload)?;
    let (Some(trader_index), Some(order_id)) = (req.trader_index, req.order_id) else {
        return Err(ApiError::bad_request(
            "missing required fields: trader_index, order_id",
        ));
    };

    let slot = state.pool.get(trader_index)?;
    let mut session = slot.session.lock().await;
    let outcome = session.cancel_order(order_id).await?;
    Ok(Json(json!(outcome)))
}

/// Query one order on one session.
pub(super) async fn query_order(
    State(state): State<AppState>,
    payload: Body<OrderActionRequest>,
) -> Result<Json<Value>, ApiError> {
    let req = require(payload)?;
    let (Some(trader_index), Some(order_id)) = (req.trader_index, req.order_id) else {
        return Err(ApiError::bad_request(
            "missing required fields: trader_index, order_id",
        ));
    };

    let slot = state.pool.get(trader_index)?;
    let mut session = slot.session.lock().await;
    match session.order(order_id).await? {
        Some(view) => Ok(Json(json!({ "message": "ok", "order": view }))),
        None => Err(ApiError::bad_request(format!(
            "order not found: {order_id}"
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct OrdersRequest {
    trader_index: Option<usize>,
    #[serde(default)]
    cancelable_only: bool,
}

/// Query all orders of one session.
pub(super) async fn query_orders(
    State(state): State<AppState>,
    payload: Body<OrdersRequest>,
) -> Result<Json<Value>, ApiError> {
    let req = require(payload)?;
    let Some(trader_index) = req.trader_index else {
        return Err(ApiError::bad_request("missing required field: trader_index"));
    };

    let slot = state.pool.get(trader_index)?;
    let mut session = slot.session.lock().await;
    let views = session.orders(req.cancelable_only).await?;
    Ok(Json(json!({ "message": "ok", "orders": views })))
}

/// Cancel every cancelable sell order of one session.
pub(super) async fn cancel_orders_sell(
    state: State<AppState>,
    payload: Body<TraderIndexRequest>,
) -> Result<Json<Value>, ApiError> {
    cancel_side(state, payload, OrderSide::Sell).await
}

/// Cancel every cancelable buy order of one session.
pub(super) async fn cancel_orders_buy(
    state: State<AppState>,
    payload: Body<TraderIndexRequest>,
) -> Result<Json<Value>, ApiError> {
    cancel_side(state, payload, OrderSide::Buy).await
}

async fn cancel_side(
    State(state): State<AppState>,
    payload: Body<TraderIndexRequest>,
    side: OrderSide,
) -> Result<Json<Value>, ApiError> {
    let req = require(payload)?;
    let Some(trader_index) = req.trader_index else {
        return Err(ApiError::bad_request("missing required field: trader_index"));
    };

    let slot = state.pool.get(trader_index)?;
    let mut session = slot.session.lock().await;
    let outcomes = session.cancel_all(side).await?;
    let accepted = outcomes.iter().filter(|o| o.success).count();

    Ok(Json(json!({
        "message": format!("canceled {accepted} {side} orders"),
        "results": outcomes,
    })))
}
