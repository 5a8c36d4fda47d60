//! Per-symbol order book
//!
//! Two price ladders plus an id lookup so cancellation does not need to
//! know the resting price. The book also tracks the last trade and
//! cumulative volume for market-data snapshots.
//!
//! The book itself is not synchronized; the engine wraps each book in a
//! mutex held for the entire processing of one incoming order.

pub mod ask_book;
pub mod bid_book;
pub mod price_level;

pub use ask_book::AskBook;
pub use bid_book::BidBook;
pub use price_level::{FrontFill, LevelEntry, PriceLevel};

use std::collections::HashMap;
use types::prelude::*;

/// Order book for a single symbol.
#[derive(Debug)]
pub struct OrderBook {
    symbol: Symbol,
    bids: BidBook,
    asks: AskBook,
    /// Resting order id → (side, price), for O(1) removal
    index: HashMap<OrderId, (Side, Price)>,
    last_trade_price: Price,
    last_trade_quantity: Quantity,
    total_volume: u64,
}

impl OrderBook {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            bids: BidBook::new(),
            asks: AskBook::new(),
            index: HashMap::new(),
            last_trade_price: Price::ZERO,
            last_trade_quantity: Quantity::ZERO,
            total_volume: 0,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Rest a limit order's unfilled quantity on its ladder.
    ///
    /// Only non-terminal limit orders with unfilled quantity may rest.
    pub fn add(&mut self, order: &Order) {
        debug_assert_eq!(order.order_type, OrderType::Limit);
        debug_assert!(!order.status.is_terminal());
        debug_assert!(!order.remaining().is_zero());

        self.index.insert(order.order_id, (order.side, order.price));
        match order.side {
            Side::Buy => self
                .bids
                .insert(order.price, order.order_id, order.user_id, order.remaining()),
            Side::Sell => self
                .asks
                .insert(order.price, order.order_id, order.user_id, order.remaining()),
        }
    }

    /// Remove a resting order by id. Returns false if it is not resting.
    pub fn remove(&mut self, order_id: OrderId) -> bool {
        let Some((side, price)) = self.index.remove(&order_id) else {
            return false;
        };
        match side {
            Side::Buy => self.bids.remove(order_id, price),
            Side::Sell => self.asks.remove(order_id, price),
        }
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.index.contains_key(&order_id)
    }

    /// Best bid price and aggregate quantity, if any
    pub fn best_bid(&self) -> Option<(Price, Quantity)> {
        self.bids.best()
    }

    /// Best ask price and aggregate quantity, if any
    pub fn best_ask(&self) -> Option<(Price, Quantity)> {
        self.asks.best()
    }

    pub fn bid_depth(&self, depth: usize) -> Vec<(Price, Quantity)> {
        self.bids.depth(depth)
    }

    pub fn ask_depth(&self, depth: usize) -> Vec<(Price, Quantity)> {
        self.asks.depth(depth)
    }

    /// Front order of the best bid level: (id, owner, remaining, price)
    pub fn best_bid_order(&mut self) -> Option<(OrderId, UserId, Quantity, Price)> {
        loop {
            let (price, level) = self.bids.best_level_mut()?;
            if let Some((order_id, user_id, remaining)) = level.front() {
                return Some((order_id, user_id, remaining, price));
            }
            self.bids.prune(price);
        }
    }

    /// Front order of the best ask level: (id, owner, remaining, price)
    pub fn best_ask_order(&mut self) -> Option<(OrderId, UserId, Quantity, Price)> {
        loop {
            let (price, level) = self.asks.best_level_mut()?;
            if let Some((order_id, user_id, remaining)) = level.front() {
                return Some((order_id, user_id, remaining, price));
            }
            self.asks.prune(price);
        }
    }

    /// Consume `quantity` from the front order of `maker_side`'s best level.
    ///
    /// Exhausted makers leave the book and the id index; emptied levels are
    /// pruned.
    pub fn fill_best(&mut self, maker_side: Side, quantity: Quantity) -> Option<FrontFill> {
        let (price, fill) = match maker_side {
            Side::Buy => {
                let (price, level) = self.bids.best_level_mut()?;
                (price, level.fill_front(quantity)?)
            }
            Side::Sell => {
                let (price, level) = self.asks.best_level_mut()?;
                (price, level.fill_front(quantity)?)
            }
        };

        if fill.exhausted {
            self.index.remove(&fill.order_id);
            match maker_side {
                Side::Buy => self.bids.prune(price),
                Side::Sell => self.asks.prune(price),
            }
        }
        Some(fill)
    }

    /// Record an executed trade for snapshots and volume accounting
    pub fn update_last_trade(&mut self, price: Price, quantity: Quantity) {
        self.last_trade_price = price;
        self.last_trade_quantity = quantity;
        self.total_volume += quantity.raw();
    }

    /// Immutable top-of-book snapshot. Empty sides read as zero.
    pub fn snapshot(&self, timestamp: i64) -> MarketSnapshot {
        let (bid_price, bid_quantity) = self
            .bids
            .best()
            .unwrap_or((Price::ZERO, Quantity::ZERO));
        let (ask_price, ask_quantity) = self
            .asks
            .best()
            .unwrap_or((Price::ZERO, Quantity::ZERO));

        MarketSnapshot {
            symbol: self.symbol.clone(),
            last_trade_price: self.last_trade_price,
            last_trade_quantity: self.last_trade_quantity,
            bid_price,
            bid_quantity,
            ask_price,
            ask_quantity,
            total_volume: self.total_volume,
            timestamp,
        }
    }
}
