use serde::{Deserialize, Serialize};

/// Account-level asset summary as reported by a broker session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Portfolio {
    pub total_asset: f64,
    /// Cash available for new orders.
    pub cash: f64,
    /// Cash locked by open orders.
    pub frozen_cash: f64,
    /// Market value of all holdings.
    pub market_value: f64,
    pub profit: f64,
    pub profit_ratio: f64,
}

/// One holding of an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub name: String,
    /// Total held quantity.
    pub volume: u64,
    /// Quantity available to sell today.
    pub can_use_volume: u64,
    /// Quantity locked by open sell orders.
    pub frozen_volume: u64,
    pub market_value: f64,
    pub avg_price: f64,
    pub open_price: f64,
    pub current_price: f64,
    pub profit: f64,
    pub profit_ratio: f64,
}

impl Position {
    pub fn new(symbol: impl Into<String>, volume: u64, avg_price: f64) -> Self {
        let symbol = symbol.into();
        Self {
            name: symbol.clone(),
            symbol,
            volume,
            can_use_volume: volume,
            frozen_volume: 0,
            market_value: volume as f64 * avg_price,
            avg_price,
            open_price: avg_price,
            current_price: avg_price,
            profit: 0.0,
            profit_ratio: 0.0,
        }
    }
}
