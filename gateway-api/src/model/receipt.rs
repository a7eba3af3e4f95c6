use crate::model::order::{OrderSide, PriceType};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a submitted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Resting on the book, cancelable.
    Open,
    Filled,
    Cancelled,
    Rejected,
}

/// Returned by a broker session when an order has been accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReceipt {
    /// Broker-assigned id; absent for no-op submissions (e.g. a zero-size
    /// rebalance delta).
    pub order_id: Option<String>,
    pub symbol: String,
    pub side: OrderSide,
    pub order_num: u64,
    pub price: f64,
    /// Notional value of the submission.
    pub value: f64,
    pub message: String,
}

impl OrderReceipt {
    pub fn new(symbol: impl Into<String>, side: OrderSide, order_num: u64, price: f64) -> Self {
        Self {
            order_id: None,
            symbol: symbol.into(),
            side,
            order_num,
            price,
            value: order_num as f64 * price,
            message: String::new(),
        }
    }

    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

/// A row in the order book of one account, as returned by order queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub price: f64,
    pub volume: u64,
    pub traded_volume: u64,
    pub price_type: PriceType,
    pub status: OrderStatus,
    pub strategy_name: String,
    /// Submission time, unix millis.
    pub timestamp: i64,
}

impl OrderRecord {
    pub fn cancelable(&self) -> bool {
        self.status == OrderStatus::Open
    }
}
