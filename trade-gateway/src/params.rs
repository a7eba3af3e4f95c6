//! Pre-dispatch validation of order parameters.
//!
//! Runs once per request, before the trader registry is consulted, so a
//! malformed request never reaches any account.

use gateway::symbol::{lot_size, unit_name};
use gateway::{OrderSizing, PriceType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("request body missing or malformed")]
    EmptyBody,

    #[error("request body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("position_pct and order_num are mutually exclusive, provide one")]
    AmbiguousSizing,

    #[error("one of position_pct or order_num is required")]
    MissingSizing,

    #[error("position_pct must be within [0, 1], got {0}")]
    OutOfRangePct(f64),

    #[error("order_num must be a positive multiple of {lot} ({unit}), got {order_num}")]
    InvalidLotMultiple {
        order_num: i64,
        lot: u64,
        unit: &'static str,
    },

    #[error("unknown price type code: {0}")]
    InvalidPriceType(i64),

    #[error("invalid trader index: {0}")]
    InvalidTraderIndex(i64),

    #[error("operation must be buy or sell, got {0}")]
    InvalidOperation(String),

    #[error("reserve_amount must not be negative, got {0}")]
    NegativeReserve(f64),
}

/// Resolve the sizing mode of a trade request.
///
/// Exactly one of `position_pct` / `order_num` must be supplied; the
/// quantity form must be a positive multiple of the lot size that `symbol`'s
/// instrument class implies.
pub fn resolve_sizing(
    position_pct: Option<f64>,
    order_num: Option<i64>,
    symbol: &str,
) -> Result<OrderSizing, ValidationError> {
    match (position_pct, order_num) {
        (Some(_), Some(_)) => Err(ValidationError::AmbiguousSizing),
        (None, None) => Err(ValidationError::MissingSizing),
        (Some(pct), None) => {
            if !(0.0..=1.0).contains(&pct) {
                return Err(ValidationError::OutOfRangePct(pct));
            }
            Ok(OrderSizing::PositionPct(pct))
        }
        (None, Some(n)) => {
            let lot = lot_size(symbol);
            if n <= 0 || n as u64 % lot != 0 {
                return Err(ValidationError::InvalidLotMultiple {
                    order_num: n,
                    lot,
                    unit: unit_name(symbol),
                });
            }
            Ok(OrderSizing::Shares(n as u64))
        }
    }
}

/// Resolve the wire price-type code; absent means limit.
pub fn resolve_price_type(code: Option<i64>) -> Result<PriceType, ValidationError> {
    let code = code.unwrap_or(0);
    PriceType::from_code(code).ok_or(ValidationError::InvalidPriceType(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizing_modes_are_mutually_exclusive() {
        assert!(matches!(
            resolve_sizing(Some(0.5), Some(100), "000001"),
            Err(ValidationError::AmbiguousSizing)
        ));
        assert!(matches!(
            resolve_sizing(None, None, "000001"),
            Err(ValidationError::MissingSizing)
        ));
    }

    #[test]
    fn pct_must_be_a_fraction() {
        assert!(matches!(
            resolve_sizing(Some(1.2), None, "000001"),
            Err(ValidationError::OutOfRangePct(_))
        ));
        assert!(matches!(
            resolve_sizing(Some(-0.1), None, "000001"),
            Err(ValidationError::OutOfRangePct(_))
        ));
        assert_eq!(
            resolve_sizing(Some(1.0), None, "000001").unwrap(),
            OrderSizing::PositionPct(1.0)
        );
    }

    #[test]
    fn equity_orders_must_be_board_lots() {
        assert!(matches!(
            resolve_sizing(None, Some(150), "000001"),
            Err(ValidationError::InvalidLotMultiple { lot: 100, .. })
        ));
        assert!(matches!(
            resolve_sizing(None, Some(0), "000001"),
            Err(ValidationError::InvalidLotMultiple { .. })
        ));
        assert!(matches!(
            resolve_sizing(None, Some(-100), "000001"),
            Err(ValidationError::InvalidLotMultiple { .. })
        ));
        assert_eq!(
            resolve_sizing(None, Some(500), "000001").unwrap(),
            OrderSizing::Shares(500)
        );
    }

    #[test]
    fn bond_orders_use_the_smaller_lot() {
        assert_eq!(
            resolve_sizing(None, Some(30), "123077").unwrap(),
            OrderSizing::Shares(30)
        );
        assert!(matches!(
            resolve_sizing(None, Some(35), "123077"),
            Err(ValidationError::InvalidLotMultiple { lot: 10, .. })
        ));
    }

    #[test]
    fn price_type_codes() {
        assert_eq!(resolve_price_type(None).unwrap(), PriceType::Limit);
        assert_eq!(resolve_price_type(Some(5)).unwrap(), PriceType::CounterBest);
        assert!(matches!(
            resolve_price_type(Some(4)),
            Err(ValidationError::InvalidPriceType(4))
        ));
    }
}
