//! Request payloads.
//!
//! Every field is optional at the serde level; required-field and sizing
//! checks run in the handlers so violations come back as 400s with the
//! validation taxonomy, not as generic deserialization errors.

use serde::Deserialize;

/// `POST /buy`, `POST /sell` — fixed-quantity order.
#[derive(Debug, Default, Deserialize)]
pub struct SharesTradeRequest {
    pub symbol: Option<String>,
    pub price: Option<f64>,
    pub shares: Option<i64>,
    pub price_type: Option<i64>,
    pub strategy_name: Option<String>,
    pub trader_index: Option<i64>,
}

/// `POST /trade` — move holding to a percentage of account value.
#[derive(Debug, Default, Deserialize)]
pub struct PctTradeRequest {
    pub symbol: Option<String>,
    pub trade_price: Option<f64>,
    pub position_pct: Option<f64>,
    // Historical clients send "pricetype" here.
    #[serde(alias = "pricetype")]
    pub price_type: Option<i64>,
    pub strategy_name: Option<String>,
    pub trader_index: Option<i64>,
}

/// `POST /outer/trade/:operation` — third-party entry point, percentage or
/// fixed-quantity sizing.
#[derive(Debug, Default, Deserialize)]
pub struct OuterTradeRequest {
    pub symbol: Option<String>,
    pub trade_price: Option<f64>,
    pub price_type: Option<i64>,
    pub position_pct: Option<f64>,
    pub order_num: Option<i64>,
    pub strategy_name: Option<String>,
    pub trader_index: Option<i64>,
}

/// `POST /trade/allin`.
#[derive(Debug, Default, Deserialize)]
pub struct AllinRequest {
    pub symbol: Option<String>,
    pub cur_price: Option<f64>,
    pub trader_index: Option<i64>,
}

/// `POST /trade/nhg`.
#[derive(Debug, Default, Deserialize)]
pub struct ReverseRepoRequest {
    pub reserve_amount: Option<f64>,
    pub trader_index: Option<i64>,
}

/// `POST /cancel_orders/sale`, `POST /cancel_orders/buy`.
#[derive(Debug, Default, Deserialize)]
pub struct CancelAllRequest {
    pub trader_index: Option<i64>,
}

/// `POST /cancel_order`, `POST /order` — single-account, index required.
#[derive(Debug, Default, Deserialize)]
pub struct OrderRequest {
    pub order_id: Option<String>,
    pub trader_index: Option<i64>,
}

/// `POST /orders`.
#[derive(Debug, Default, Deserialize)]
pub struct OrdersQueryRequest {
    pub trader_index: Option<i64>,
    pub cancelable_only: Option<bool>,
}
