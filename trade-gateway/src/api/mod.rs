//! HTTP surface of the gateway.
//!
//! Every route except `/health` sits behind the signature middleware.
//! Batch-capable handlers all follow the same shape: validate parameters,
//! resolve the account subset through the registry, dispatch, reply 200
//! with the aggregated batch result.

pub mod dto;

use axum::extract::{Path, State};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use gateway::{BrokerSession, OrderSide, SessionError, TradeOrder};
use log::info;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::auth;
use crate::dispatch::{self, BatchResult};
use crate::error::ApiError;
use crate::params::{self, ValidationError};
use crate::state::AppState;

use self::dto::*;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/accounts", get(get_accounts))
        .route("/portfolio/:trader_index", get(get_portfolio))
        .route("/positions/:trader_index", get(get_positions))
        .route("/buy", post(buy))
        .route("/sell", post(sell))
        .route("/trade", post(trade))
        .route("/outer/trade/:operation", post(outer_trade))
        .route("/trade/allin", post(trade_allin))
        .route("/trade/nhg", post(reverse_repo))
        .route("/cancel_orders/sale", post(cancel_orders_sale))
        .route("/cancel_orders/buy", post(cancel_orders_buy))
        .route("/cancel_order", post(cancel_order))
        .route("/order", post(query_order))
        .route("/orders", post(query_orders))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_signature,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn require<T>(value: Option<T>, name: &'static str) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::MissingField(name))
}

fn required_body<T>(body: Option<Json<T>>) -> Result<T, ValidationError> {
    body.map(|Json(inner)| inner)
        .ok_or(ValidationError::EmptyBody)
}

fn body_or_default<T: Default>(body: Option<Json<T>>) -> T {
    body.map(|Json(inner)| inner).unwrap_or_default()
}

fn receipt_value<T: serde::Serialize>(
    result: Result<T, SessionError>,
) -> Result<Value, SessionError> {
    result.map(|v| serde_json::to_value(v).unwrap_or(Value::Null))
}

async fn health() -> &'static str {
    "OK"
}

async fn get_accounts(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "accounts": state.registry.accounts() }))
}

async fn get_portfolio(
    State(state): State<AppState>,
    Path(trader_index): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let (_, session) = state.registry.get(trader_index)?;
    let portfolio = session.get_portfolio().await?;
    Ok(Json(json!({ "portfolio": portfolio })))
}

async fn get_positions(
    State(state): State<AppState>,
    Path(trader_index): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let (_, session) = state.registry.get(trader_index)?;
    let positions = session.get_positions().await?;
    Ok(Json(json!({ "positions": positions })))
}

async fn shares_trade(
    state: &AppState,
    req: SharesTradeRequest,
    side: OrderSide,
) -> Result<BatchResult, ApiError> {
    let symbol = require(req.symbol, "symbol")?;
    let price = require(req.price, "price")?;
    let shares = require(req.shares, "shares")?;
    let sizing = params::resolve_sizing(None, Some(shares), &symbol)?;
    let price_type = params::resolve_price_type(req.price_type)?;
    let accounts = state.registry.resolve(req.trader_index)?;

    let order = TradeOrder::new(
        gateway::symbol::qualified(&symbol),
        price,
        sizing,
        price_type,
        req.strategy_name.unwrap_or_else(|| "web_ui".to_string()),
    );
    let operation = match side {
        OrderSide::Buy => "buy",
        OrderSide::Sell => "sell",
    };
    info!(
        "{} request: symbol={} price={} shares={} trader_index={:?}",
        operation, order.symbol, price, shares, req.trader_index
    );

    Ok(dispatch::execute(operation, accounts, |s| {
        let order = order.clone();
        async move {
            match side {
                OrderSide::Buy => receipt_value(s.place_buy(&order).await),
                OrderSide::Sell => receipt_value(s.place_sell(&order).await),
            }
        }
    })
    .await)
}

async fn buy(
    State(state): State<AppState>,
    body: Option<Json<SharesTradeRequest>>,
) -> Result<Json<BatchResult>, ApiError> {
    let req = required_body(body)?;
    Ok(Json(shares_trade(&state, req, OrderSide::Buy).await?))
}

async fn sell(
    State(state): State<AppState>,
    body: Option<Json<SharesTradeRequest>>,
) -> Result<Json<BatchResult>, ApiError> {
    let req = required_body(body)?;
    Ok(Json(shares_trade(&state, req, OrderSide::Sell).await?))
}

async fn trade(
    State(state): State<AppState>,
    body: Option<Json<PctTradeRequest>>,
) -> Result<Json<BatchResult>, ApiError> {
    let req = required_body(body)?;
    let symbol = gateway::symbol::qualified(&require(req.symbol, "symbol")?);
    let trade_price = require(req.trade_price, "trade_price")?;
    let position_pct = require(req.position_pct, "position_pct")?;
    // Range check via the shared resolver.
    params::resolve_sizing(Some(position_pct), None, &symbol)?;
    let price_type = params::resolve_price_type(req.price_type)?;
    let accounts = state.registry.resolve(req.trader_index)?;
    let strategy_name = req.strategy_name.unwrap_or_else(|| "web_ui".to_string());

    info!(
        "trade request: symbol={} trade_price={} position_pct={} trader_index={:?}",
        symbol, trade_price, position_pct, req.trader_index
    );

    let batch = dispatch::execute("trade", accounts, |s| {
        let symbol = symbol.clone();
        let strategy_name = strategy_name.clone();
        async move {
            receipt_value(
                s.target_position(&symbol, trade_price, position_pct, price_type, &strategy_name)
                    .await,
            )
        }
    })
    .await;
    Ok(Json(batch))
}

async fn outer_trade(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    body: Option<Json<OuterTradeRequest>>,
) -> Result<Json<BatchResult>, ApiError> {
    let side = match operation.as_str() {
        "buy" => OrderSide::Buy,
        "sell" => OrderSide::Sell,
        _ => return Err(ValidationError::InvalidOperation(operation).into()),
    };
    let req = required_body(body)?;
    let symbol = gateway::symbol::qualified(&require(req.symbol, "symbol")?);
    let trade_price = require(req.trade_price, "trade_price")?;
    let sizing = params::resolve_sizing(req.position_pct, req.order_num, &symbol)?;
    let price_type = params::resolve_price_type(req.price_type)?;
    let accounts = state.registry.resolve(req.trader_index)?;

    let order = TradeOrder::new(
        symbol,
        trade_price,
        sizing,
        price_type,
        req.strategy_name.unwrap_or_else(|| "external".to_string()),
    );
    let operation = match side {
        OrderSide::Buy => "outer buy",
        OrderSide::Sell => "outer sell",
    };
    info!(
        "{} request: symbol={} trade_price={} sizing={:?} trader_index={:?}",
        operation, order.symbol, trade_price, order.sizing, req.trader_index
    );

    let batch = dispatch::execute(operation, accounts, |s| {
        let order = order.clone();
        async move {
            match side {
                OrderSide::Buy => receipt_value(s.place_buy(&order).await),
                OrderSide::Sell => receipt_value(s.place_sell(&order).await),
            }
        }
    })
    .await;
    Ok(Json(batch))
}

async fn trade_allin(
    State(state): State<AppState>,
    body: Option<Json<AllinRequest>>,
) -> Result<Json<BatchResult>, ApiError> {
    let req = required_body(body)?;
    let symbol = gateway::symbol::qualified(&require(req.symbol, "symbol")?);
    let cur_price = require(req.cur_price, "cur_price")?;
    let accounts = state.registry.resolve(req.trader_index)?;

    info!(
        "allin request: symbol={} cur_price={} trader_index={:?}",
        symbol, cur_price, req.trader_index
    );

    let batch = dispatch::execute("allin", accounts, |s| {
        let symbol = symbol.clone();
        async move {
            receipt_value(
                s.target_position(&symbol, cur_price, 1.0, gateway::PriceType::Limit, "allin")
                    .await,
            )
        }
    })
    .await;
    Ok(Json(batch))
}

async fn reverse_repo(
    State(state): State<AppState>,
    body: Option<Json<ReverseRepoRequest>>,
) -> Result<Json<BatchResult>, ApiError> {
    let req = body_or_default(body);
    let reserve_amount = req.reserve_amount.unwrap_or(0.0);
    if reserve_amount < 0.0 {
        return Err(ValidationError::NegativeReserve(reserve_amount).into());
    }
    let accounts = state.registry.resolve(req.trader_index)?;

    info!(
        "reverse repo request: reserve_amount={} trader_index={:?}",
        reserve_amount, req.trader_index
    );

    let batch = dispatch::execute("reverse repo", accounts, |s| async move {
        receipt_value(s.reverse_repo(reserve_amount).await)
    })
    .await;
    Ok(Json(batch))
}

async fn cancel_all(
    state: &AppState,
    trader_index: Option<i64>,
    side: OrderSide,
) -> Result<BatchResult, ApiError> {
    let accounts = state.registry.resolve(trader_index)?;
    let operation = match side {
        OrderSide::Buy => "cancel all buy orders",
        OrderSide::Sell => "cancel all sell orders",
    };
    let batch = dispatch::execute(operation, accounts, |s| async move {
        let cancelled = match side {
            OrderSide::Buy => s.cancel_all_buy().await?,
            OrderSide::Sell => s.cancel_all_sell().await?,
        };
        Ok(json!({ "cancelled": cancelled }))
    })
    .await;
    Ok(batch)
}

async fn cancel_orders_sale(
    State(state): State<AppState>,
    body: Option<Json<CancelAllRequest>>,
) -> Result<Json<BatchResult>, ApiError> {
    let req = body_or_default(body);
    Ok(Json(cancel_all(&state, req.trader_index, OrderSide::Sell).await?))
}

async fn cancel_orders_buy(
    State(state): State<AppState>,
    body: Option<Json<CancelAllRequest>>,
) -> Result<Json<BatchResult>, ApiError> {
    let req = body_or_default(body);
    Ok(Json(cancel_all(&state, req.trader_index, OrderSide::Buy).await?))
}

async fn cancel_order(
    State(state): State<AppState>,
    body: Option<Json<OrderRequest>>,
) -> Result<Json<Value>, ApiError> {
    let req = required_body(body)?;
    let trader_index = require(req.trader_index, "trader_index")?;
    let order_id = require(req.order_id, "order_id")?;
    let (_, session) = state.registry.get(trader_index)?;
    session.cancel_order(&order_id).await?;
    Ok(Json(json!({ "message": "cancel submitted", "order_id": order_id })))
}

async fn query_order(
    State(state): State<AppState>,
    body: Option<Json<OrderRequest>>,
) -> Result<Json<Value>, ApiError> {
    let req = required_body(body)?;
    let trader_index = require(req.trader_index, "trader_index")?;
    let order_id = require(req.order_id, "order_id")?;
    let (_, session) = state.registry.get(trader_index)?;
    let record = session.query_order(&order_id).await?;
    Ok(Json(json!({ "order": record })))
}

async fn query_orders(
    State(state): State<AppState>,
    body: Option<Json<OrdersQueryRequest>>,
) -> Result<Json<Value>, ApiError> {
    let req = required_body(body)?;
    let trader_index = require(req.trader_index, "trader_index")?;
    let (_, session) = state.registry.get(trader_index)?;
    let records = session
        .query_orders(req.cancelable_only.unwrap_or(false))
        .await?;
    Ok(Json(json!({ "orders": records })))
}
