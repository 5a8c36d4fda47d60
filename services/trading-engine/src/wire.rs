//! Wire message formats
//!
//! JSON shapes for the pub/sub channels and the snapshot side-channel.
//! Prices travel as decimal numbers; the fixed-point conversion happens
//! here and nowhere else on the way out.

use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use types::prelude::*;

fn price_out(price: Price, scale: u32) -> f64 {
    price.to_decimal(scale).to_f64().unwrap_or(0.0)
}

/// Trade channel message
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub trade_id: u64,
    pub buy_order_id: u64,
    pub sell_order_id: u64,
    pub buy_user_id: u64,
    pub sell_user_id: u64,
    pub symbol: String,
    pub price: f64,
    pub quantity: u64,
    #[serde(rename = "timestamp_ms")]
    pub timestamp_ms: i64,
}

pub fn trade_message(trade: &Trade, scale: u32) -> TradeMessage {
    TradeMessage {
        kind: "trade",
        trade_id: trade.trade_id.as_u64(),
        buy_order_id: trade.buy_order_id.as_u64(),
        sell_order_id: trade.sell_order_id.as_u64(),
        buy_user_id: trade.buy_user_id.as_u64(),
        sell_user_id: trade.sell_user_id.as_u64(),
        symbol: trade.symbol.as_str().to_string(),
        price: price_out(trade.price, scale),
        quantity: trade.quantity.raw(),
        timestamp_ms: trade.executed_at,
    }
}

/// Order-update channel message: the full order object
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub order_id: u64,
    pub user_id: u64,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub price: f64,
    pub quantity: u64,
    pub filled_quantity: u64,
    pub status: OrderStatus,
    #[serde(rename = "timestamp_ms")]
    pub timestamp_ms: i64,
}

pub fn order_message(order: &Order, scale: u32) -> OrderMessage {
    OrderMessage {
        kind: "order",
        order_id: order.order_id.as_u64(),
        user_id: order.user_id.as_u64(),
        symbol: order.symbol.as_str().to_string(),
        side: order.side,
        order_type: order.order_type,
        time_in_force: order.time_in_force,
        price: price_out(order.price, scale),
        quantity: order.quantity.raw(),
        filled_quantity: order.filled_quantity.raw(),
        status: order.status,
        timestamp_ms: order.created_at,
    }
}

/// Market-data channel tick: last fill plus resulting top-of-book
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub symbol: String,
    pub last_trade_price: f64,
    pub last_trade_quantity: u64,
    pub bid_price: f64,
    pub bid_quantity: u64,
    pub ask_price: f64,
    pub ask_quantity: u64,
    pub total_volume: u64,
    #[serde(rename = "timestamp_ms")]
    pub timestamp_ms: i64,
}

pub fn tick_message(snapshot: &MarketSnapshot, scale: u32) -> TickMessage {
    TickMessage {
        kind: "tick",
        symbol: snapshot.symbol.as_str().to_string(),
        last_trade_price: price_out(snapshot.last_trade_price, scale),
        last_trade_quantity: snapshot.last_trade_quantity.raw(),
        bid_price: price_out(snapshot.bid_price, scale),
        bid_quantity: snapshot.bid_quantity.raw(),
        ask_price: price_out(snapshot.ask_price, scale),
        ask_quantity: snapshot.ask_quantity.raw(),
        total_volume: snapshot.total_volume,
        timestamp_ms: snapshot.timestamp,
    }
}

/// Persisted order-book snapshot (same shape as a tick, different tag)
pub fn book_message(snapshot: &MarketSnapshot, scale: u32) -> TickMessage {
    TickMessage {
        kind: "snapshot",
        ..tick_message(snapshot, scale)
    }
}

/// Error channel message
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub code: &'static str,
    pub message: String,
    #[serde(rename = "timestamp_ms")]
    pub timestamp_ms: i64,
}

pub fn error_message(error: &EngineError, context: &str, timestamp_ms: i64) -> ErrorMessage {
    ErrorMessage {
        kind: "error",
        code: error.code(),
        message: format!("{error} ({context})"),
        timestamp_ms,
    }
}

/// Persisted balance record
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceMessage {
    pub user_id: u64,
    pub available_balance: i64,
    pub locked_balance: i64,
}

pub fn balance_message(balance: &UserBalance) -> BalanceMessage {
    BalanceMessage {
        user_id: balance.user_id.as_u64(),
        available_balance: balance.available,
        locked_balance: balance.locked,
    }
}

/// One aggregated ladder level in a depth query
#[derive(Debug, Serialize)]
pub struct DepthLevel {
    pub price: f64,
    pub quantity: u64,
}

/// Order-book depth query response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBookMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub symbol: String,
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
    #[serde(rename = "timestamp_ms")]
    pub timestamp_ms: i64,
}

pub fn order_book_message(
    symbol: &Symbol,
    bids: &[(Price, Quantity)],
    asks: &[(Price, Quantity)],
    scale: u32,
    timestamp_ms: i64,
) -> OrderBookMessage {
    let level = |&(price, quantity): &(Price, Quantity)| DepthLevel {
        price: price_out(price, scale),
        quantity: quantity.raw(),
    };
    OrderBookMessage {
        kind: "orderbook",
        symbol: symbol.as_str().to_string(),
        bids: bids.iter().map(level).collect(),
        asks: asks.iter().map(level).collect(),
        timestamp_ms,
    }
}
