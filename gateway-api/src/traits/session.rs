use crate::error::SessionError;
use crate::model::order::{PriceType, TradeOrder};
use crate::model::portfolio::{Portfolio, Position};
use crate::model::receipt::{OrderReceipt, OrderRecord};
use async_trait::async_trait;

/// One broker-connected trading session.
///
/// The dispatch engine owns a registry of these and runs each requested
/// operation against a subset of them. Implementations are expected to bound
/// every call with their own timeout; a slow or failed call surfaces as a
/// `SessionError` for that account only.
#[async_trait]
pub trait BrokerSession: Send + Sync {
    /// Broker-assigned account identifier.
    fn account_id(&self) -> &str;

    /// Optional human label for the account.
    fn display_name(&self) -> Option<&str>;

    /// Submit a buy order. Sizing may be absolute shares or a fraction of
    /// account value; the session resolves the fraction against its own
    /// books.
    async fn place_buy(&self, order: &TradeOrder) -> Result<OrderReceipt, SessionError>;

    /// Submit a sell order. A fractional sizing sells that share of the
    /// available holding.
    async fn place_sell(&self, order: &TradeOrder) -> Result<OrderReceipt, SessionError>;

    /// Move the holding of `symbol` toward `position_pct` of total account
    /// value, buying or selling the lot-rounded difference.
    async fn target_position(
        &self,
        symbol: &str,
        price: f64,
        position_pct: f64,
        price_type: PriceType,
        strategy_name: &str,
    ) -> Result<OrderReceipt, SessionError>;

    /// Cancel every open buy order. Returns the number cancelled.
    async fn cancel_all_buy(&self) -> Result<u64, SessionError>;

    /// Cancel every open sell order. Returns the number cancelled.
    async fn cancel_all_sell(&self) -> Result<u64, SessionError>;

    async fn cancel_order(&self, order_id: &str) -> Result<(), SessionError>;

    async fn query_order(&self, order_id: &str) -> Result<OrderRecord, SessionError>;

    async fn query_orders(&self, cancelable_only: bool) -> Result<Vec<OrderRecord>, SessionError>;

    async fn get_portfolio(&self) -> Result<Portfolio, SessionError>;

    async fn get_positions(&self) -> Result<Vec<Position>, SessionError>;

    /// Park idle cash in an exchange reverse repo, keeping `reserve_amount`
    /// back.
    async fn reverse_repo(&self, reserve_amount: f64) -> Result<OrderReceipt, SessionError>;
}
