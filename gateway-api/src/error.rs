use thiserror::Error;

/// Errors raised by a broker session while executing one account's leg of a
/// batch. These never abort the batch; the dispatcher captures them per
/// account.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("symbol not held: {0}")]
    NotHeld(String),

    #[error("insufficient available volume for {symbol}: have {available}, need {requested}")]
    InsufficientVolume {
        symbol: String,
        available: u64,
        requested: u64,
    },

    #[error("insufficient cash: have {available:.2}, need {required:.2}")]
    InsufficientCash { available: f64, required: f64 },

    #[error("unknown order id: {0}")]
    UnknownOrder(String),

    #[error("order {0} is not cancelable")]
    NotCancelable(String),

    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("broker session unavailable: {0}")]
    Unavailable(String),
}
