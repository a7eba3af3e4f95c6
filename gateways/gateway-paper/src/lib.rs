//! In-memory broker session with paper fills.
//!
//! Orders priced `Latest`/`BestFiveIoc`/`OwnBest`/`CounterBest` fill
//! immediately at the order's reference price; `Limit` orders rest open
//! until cancelled, since there is no market feed to cross them against.
//! Settlement is immediate (no T+1 lock-up on bought shares).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use gateway::symbol::lot_size;
use gateway::{
    BrokerSession, OrderReceipt, OrderRecord, OrderSide, OrderSizing, OrderStatus, Portfolio,
    Position, PriceType, SessionError, TradeOrder,
};
use log::info;
use uuid::Uuid;

/// Shenzhen one-day reverse repo, 100 yuan face value per unit, lot of 10.
const REVERSE_REPO_SYMBOL: &str = "131810.SZ";
const REVERSE_REPO_UNIT_VALUE: f64 = 100.0;

#[derive(Debug, Clone)]
struct Holding {
    volume: u64,
    can_use_volume: u64,
    frozen_volume: u64,
    avg_price: f64,
    last_price: f64,
}

#[derive(Debug, Default)]
struct Book {
    cash: f64,
    frozen_cash: f64,
    positions: HashMap<String, Holding>,
    orders: Vec<OrderRecord>,
}

impl Book {
    fn market_value(&self) -> f64 {
        self.positions
            .values()
            .map(|h| (h.volume + h.frozen_volume) as f64 * h.last_price)
            .sum()
    }

    fn total_asset(&self) -> f64 {
        self.cash + self.frozen_cash + self.market_value()
    }

    fn record_order(
        &mut self,
        symbol: &str,
        side: OrderSide,
        volume: u64,
        price: f64,
        price_type: PriceType,
        strategy_name: &str,
        status: OrderStatus,
    ) -> String {
        let order_id = Uuid::new_v4().to_string();
        self.orders.push(OrderRecord {
            order_id: order_id.clone(),
            symbol: symbol.to_string(),
            side,
            price,
            volume,
            traded_volume: if status == OrderStatus::Filled { volume } else { 0 },
            price_type,
            status,
            strategy_name: strategy_name.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        });
        order_id
    }

    fn apply_buy_fill(&mut self, symbol: &str, volume: u64, price: f64) {
        let h = self.positions.entry(symbol.to_string()).or_insert(Holding {
            volume: 0,
            can_use_volume: 0,
            frozen_volume: 0,
            avg_price: price,
            last_price: price,
        });
        let total = h.volume + volume;
        h.avg_price = (h.volume as f64 * h.avg_price + volume as f64 * price) / total as f64;
        h.volume = total;
        h.can_use_volume += volume;
        h.last_price = price;
    }

    fn apply_sell_fill(&mut self, symbol: &str, volume: u64, price: f64) {
        if let Some(h) = self.positions.get_mut(symbol) {
            h.volume -= volume;
            h.last_price = price;
            if h.volume == 0 && h.frozen_volume == 0 {
                self.positions.remove(symbol);
            }
        }
    }
}

pub struct PaperSession {
    account_id: String,
    display_name: Option<String>,
    book: Mutex<Book>,
}

impl PaperSession {
    pub fn new(account_id: impl Into<String>, display_name: Option<String>, cash: f64) -> Self {
        Self {
            account_id: account_id.into(),
            display_name,
            book: Mutex::new(Book {
                cash,
                ..Book::default()
            }),
        }
    }

    /// Seed a holding, for wiring demo accounts and tests.
    pub fn with_position(self, symbol: impl Into<String>, volume: u64, avg_price: f64) -> Self {
        {
            let mut book = self.book.lock().unwrap();
            book.positions.insert(
                symbol.into(),
                Holding {
                    volume,
                    can_use_volume: volume,
                    frozen_volume: 0,
                    avg_price,
                    last_price: avg_price,
                },
            );
        }
        self
    }

    fn resolve_buy_volume(&self, book: &Book, order: &TradeOrder) -> Result<u64, SessionError> {
        let lot = lot_size(&order.symbol);
        let volume = match order.sizing {
            OrderSizing::Shares(n) => n,
            OrderSizing::PositionPct(pct) => {
                let value = book.total_asset() * pct;
                (value / order.trade_price / lot as f64).floor() as u64 * lot
            }
        };
        if volume < lot {
            return Err(SessionError::Rejected(format!(
                "buy volume {} below one lot of {}",
                volume, lot
            )));
        }
        Ok(volume)
    }

    fn resolve_sell_volume(&self, book: &Book, order: &TradeOrder) -> Result<u64, SessionError> {
        let holding = book
            .positions
            .get(&order.symbol)
            .ok_or_else(|| SessionError::NotHeld(order.symbol.clone()))?;
        let lot = lot_size(&order.symbol);
        let volume = match order.sizing {
            OrderSizing::Shares(n) => n,
            OrderSizing::PositionPct(pct) => {
                (holding.can_use_volume as f64 * pct / lot as f64).floor() as u64 * lot
            }
        };
        if volume < lot {
            return Err(SessionError::Rejected(format!(
                "sell volume {} below one lot of {}",
                volume, lot
            )));
        }
        if volume > holding.can_use_volume {
            return Err(SessionError::InsufficientVolume {
                symbol: order.symbol.clone(),
                available: holding.can_use_volume,
                requested: volume,
            });
        }
        Ok(volume)
    }

    fn submit_buy(
        &self,
        book: &mut Book,
        symbol: &str,
        volume: u64,
        price: f64,
        price_type: PriceType,
        strategy_name: &str,
    ) -> Result<OrderReceipt, SessionError> {
        let cost = volume as f64 * price;
        if cost > book.cash {
            return Err(SessionError::InsufficientCash {
                available: book.cash,
                required: cost,
            });
        }
        book.cash -= cost;

        let (status, message) = if price_type == PriceType::Limit {
            book.frozen_cash += cost;
            (OrderStatus::Open, "buy order resting")
        } else {
            book.apply_buy_fill(symbol, volume, price);
            (OrderStatus::Filled, "buy order filled")
        };
        let order_id = book.record_order(
            symbol,
            OrderSide::Buy,
            volume,
            price,
            price_type,
            strategy_name,
            status,
        );
        info!(
            "{}: buy {} {} @ {} [{:?}]",
            self.account_id, symbol, volume, price, status
        );
        Ok(OrderReceipt::new(symbol, OrderSide::Buy, volume, price)
            .with_order_id(order_id)
            .with_message(message))
    }

    fn submit_sell(
        &self,
        book: &mut Book,
        symbol: &str,
        volume: u64,
        price: f64,
        price_type: PriceType,
        strategy_name: &str,
    ) -> Result<OrderReceipt, SessionError> {
        let (status, message) = {
            let h = book
                .positions
                .get_mut(symbol)
                .ok_or_else(|| SessionError::NotHeld(symbol.to_string()))?;
            if volume > h.can_use_volume {
                return Err(SessionError::InsufficientVolume {
                    symbol: symbol.to_string(),
                    available: h.can_use_volume,
                    requested: volume,
                });
            }
            h.can_use_volume -= volume;
            if price_type == PriceType::Limit {
                h.frozen_volume += volume;
                h.volume -= volume;
                (OrderStatus::Open, "sell order resting")
            } else {
                (OrderStatus::Filled, "sell order filled")
            }
        };
        if status == OrderStatus::Filled {
            book.cash += volume as f64 * price;
            book.apply_sell_fill(symbol, volume, price);
        }
        let order_id = book.record_order(
            symbol,
            OrderSide::Sell,
            volume,
            price,
            price_type,
            strategy_name,
            status,
        );
        info!(
            "{}: sell {} {} @ {} [{:?}]",
            self.account_id, symbol, volume, price, status
        );
        Ok(OrderReceipt::new(symbol, OrderSide::Sell, volume, price)
            .with_order_id(order_id)
            .with_message(message))
    }

    fn cancel_record(book: &mut Book, idx: usize) {
        let (symbol, side, volume, price) = {
            let rec = &mut book.orders[idx];
            rec.status = OrderStatus::Cancelled;
            (rec.symbol.clone(), rec.side, rec.volume, rec.price)
        };
        match side {
            OrderSide::Buy => {
                let cost = volume as f64 * price;
                book.frozen_cash -= cost;
                book.cash += cost;
            }
            OrderSide::Sell => {
                if let Some(h) = book.positions.get_mut(&symbol) {
                    h.frozen_volume -= volume;
                    h.volume += volume;
                    h.can_use_volume += volume;
                }
            }
        }
    }

    fn cancel_all_side(&self, side: OrderSide) -> u64 {
        let mut book = self.book.lock().unwrap();
        let open: Vec<usize> = book
            .orders
            .iter()
            .enumerate()
            .filter(|(_, r)| r.status == OrderStatus::Open && r.side == side)
            .map(|(i, _)| i)
            .collect();
        for idx in &open {
            Self::cancel_record(&mut book, *idx);
        }
        open.len() as u64
    }
}

#[async_trait]
impl BrokerSession for PaperSession {
    fn account_id(&self) -> &str {
        &self.account_id
    }

    fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    async fn place_buy(&self, order: &TradeOrder) -> Result<OrderReceipt, SessionError> {
        let mut book = self.book.lock().unwrap();
        let volume = self.resolve_buy_volume(&book, order)?;
        self.submit_buy(
            &mut book,
            &order.symbol,
            volume,
            order.trade_price,
            order.price_type,
            &order.strategy_name,
        )
    }

    async fn place_sell(&self, order: &TradeOrder) -> Result<OrderReceipt, SessionError> {
        let mut book = self.book.lock().unwrap();
        let volume = self.resolve_sell_volume(&book, order)?;
        self.submit_sell(
            &mut book,
            &order.symbol,
            volume,
            order.trade_price,
            order.price_type,
            &order.strategy_name,
        )
    }

    async fn target_position(
        &self,
        symbol: &str,
        price: f64,
        position_pct: f64,
        price_type: PriceType,
        strategy_name: &str,
    ) -> Result<OrderReceipt, SessionError> {
        let mut book = self.book.lock().unwrap();
        let lot = lot_size(symbol);
        let target_value = book.total_asset() * position_pct;
        let current_value = book
            .positions
            .get(symbol)
            .map(|h| (h.volume + h.frozen_volume) as f64 * h.last_price)
            .unwrap_or(0.0);
        let delta = target_value - current_value;
        let volume = (delta.abs() / price / lot as f64).floor() as u64 * lot;

        if volume == 0 {
            return Ok(
                OrderReceipt::new(symbol, OrderSide::Buy, 0, price)
                    .with_message("holding within one lot of target"),
            );
        }
        if delta > 0.0 {
            self.submit_buy(&mut book, symbol, volume, price, price_type, strategy_name)
        } else {
            self.submit_sell(&mut book, symbol, volume, price, price_type, strategy_name)
        }
    }

    async fn cancel_all_buy(&self) -> Result<u64, SessionError> {
        Ok(self.cancel_all_side(OrderSide::Buy))
    }

    async fn cancel_all_sell(&self) -> Result<u64, SessionError> {
        Ok(self.cancel_all_side(OrderSide::Sell))
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), SessionError> {
        let mut book = self.book.lock().unwrap();
        let idx = book
            .orders
            .iter()
            .position(|r| r.order_id == order_id)
            .ok_or_else(|| SessionError::UnknownOrder(order_id.to_string()))?;
        if book.orders[idx].status != OrderStatus::Open {
            return Err(SessionError::NotCancelable(order_id.to_string()));
        }
        Self::cancel_record(&mut book, idx);
        Ok(())
    }

    async fn query_order(&self, order_id: &str) -> Result<OrderRecord, SessionError> {
        let book = self.book.lock().unwrap();
        book.orders
            .iter()
            .find(|r| r.order_id == order_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownOrder(order_id.to_string()))
    }

    async fn query_orders(&self, cancelable_only: bool) -> Result<Vec<OrderRecord>, SessionError> {
        let book = self.book.lock().unwrap();
        Ok(book
            .orders
            .iter()
            .filter(|r| !cancelable_only || r.cancelable())
            .cloned()
            .collect())
    }

    async fn get_portfolio(&self) -> Result<Portfolio, SessionError> {
        let book = self.book.lock().unwrap();
        let market_value = book.market_value();
        let cost: f64 = book
            .positions
            .values()
            .map(|h| (h.volume + h.frozen_volume) as f64 * h.avg_price)
            .sum();
        let profit = market_value - cost;
        Ok(Portfolio {
            total_asset: book.total_asset(),
            cash: book.cash,
            frozen_cash: book.frozen_cash,
            market_value,
            profit,
            profit_ratio: if cost > 0.0 { profit / cost * 100.0 } else { 0.0 },
        })
    }

    async fn get_positions(&self) -> Result<Vec<Position>, SessionError> {
        let book = self.book.lock().unwrap();
        let mut positions: Vec<Position> = book
            .positions
            .iter()
            .map(|(symbol, h)| {
                let volume = h.volume + h.frozen_volume;
                let cost = volume as f64 * h.avg_price;
                let value = volume as f64 * h.last_price;
                let profit = value - cost;
                Position {
                    symbol: symbol.clone(),
                    name: symbol.clone(),
                    volume,
                    can_use_volume: h.can_use_volume,
                    frozen_volume: h.frozen_volume,
                    market_value: value,
                    avg_price: h.avg_price,
                    open_price: h.avg_price,
                    current_price: h.last_price,
                    profit,
                    profit_ratio: if cost > 0.0 { profit / cost * 100.0 } else { 0.0 },
                }
            })
            .collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(positions)
    }

    async fn reverse_repo(&self, reserve_amount: f64) -> Result<OrderReceipt, SessionError> {
        let mut book = self.book.lock().unwrap();
        let available = book.cash - reserve_amount;
        let units = (available / REVERSE_REPO_UNIT_VALUE / 10.0).floor() as i64 * 10;
        if units <= 0 {
            return Ok(OrderReceipt::new(
                REVERSE_REPO_SYMBOL,
                OrderSide::Buy,
                0,
                REVERSE_REPO_UNIT_VALUE,
            )
            .with_message("no idle cash to park"));
        }
        let units = units as u64;
        let value = units as f64 * REVERSE_REPO_UNIT_VALUE;
        book.cash -= value;
        let order_id = book.record_order(
            REVERSE_REPO_SYMBOL,
            OrderSide::Buy,
            units,
            REVERSE_REPO_UNIT_VALUE,
            PriceType::Latest,
            "reverse_repo",
            OrderStatus::Filled,
        );
        info!(
            "{}: reverse repo {} units, reserve {:.2}",
            self.account_id, units, reserve_amount
        );
        Ok(OrderReceipt::new(
            REVERSE_REPO_SYMBOL,
            OrderSide::Buy,
            units,
            REVERSE_REPO_UNIT_VALUE,
        )
        .with_order_id(order_id)
        .with_message(format!("parked {:.2} in reverse repo", value)))
    }
}
