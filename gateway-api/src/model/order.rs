use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Price mode for an order submission.
///
/// The wire codes are fixed by the upstream terminal protocol and must not
/// be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum PriceType {
    /// Limit order at the supplied reference price.
    Limit,
    /// Market order at the latest traded price.
    Latest,
    /// Best-five immediate-or-cancel.
    BestFiveIoc,
    /// Best price on our own side of the book.
    OwnBest,
    /// Best price on the counter side of the book.
    CounterBest,
}

impl PriceType {
    pub fn code(self) -> i64 {
        match self {
            PriceType::Limit => 0,
            PriceType::Latest => 1,
            PriceType::BestFiveIoc => 2,
            PriceType::OwnBest => 3,
            PriceType::CounterBest => 5,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(PriceType::Limit),
            1 => Some(PriceType::Latest),
            2 => Some(PriceType::BestFiveIoc),
            3 => Some(PriceType::OwnBest),
            5 => Some(PriceType::CounterBest),
            _ => None,
        }
    }
}

impl TryFrom<i64> for PriceType {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        PriceType::from_code(code).ok_or_else(|| format!("unknown price type code: {}", code))
    }
}

impl From<PriceType> for i64 {
    fn from(pt: PriceType) -> i64 {
        pt.code()
    }
}

/// Order size, exactly one mode per order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrderSizing {
    /// Fraction of account value, in [0, 1].
    PositionPct(f64),
    /// Absolute quantity; a positive multiple of the instrument's lot size.
    Shares(u64),
}

/// A validated order intent, ready to hand to a broker session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeOrder {
    /// Exchange-qualified symbol, e.g. "000001.SZ".
    pub symbol: String,
    /// Reference price for the order.
    pub trade_price: f64,
    pub sizing: OrderSizing,
    pub price_type: PriceType,
    pub strategy_name: String,
}

impl TradeOrder {
    pub fn new(
        symbol: impl Into<String>,
        trade_price: f64,
        sizing: OrderSizing,
        price_type: PriceType,
        strategy_name: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            trade_price,
            sizing,
            price_type,
            strategy_name: strategy_name.into(),
        }
    }
}
