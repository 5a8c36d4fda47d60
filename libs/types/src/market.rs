//! Market data snapshots

use crate::ids::Symbol;
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// Point-in-time view of one symbol's market.
///
/// Prices are `Price::ZERO` when the corresponding side of the book is
/// empty or no trade has occurred yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: Symbol,
    pub last_trade_price: Price,
    pub last_trade_quantity: Quantity,
    pub bid_price: Price,
    pub bid_quantity: Quantity,
    pub ask_price: Price,
    pub ask_quantity: Quantity,
    /// Cumulative executed volume in units
    pub total_volume: u64,
    /// Engine clock milliseconds
    pub timestamp: i64,
}

impl MarketSnapshot {
    /// An empty-market snapshot for a symbol with no activity
    pub fn empty(symbol: Symbol, timestamp: i64) -> Self {
        Self {
            symbol,
            last_trade_price: Price::ZERO,
            last_trade_quantity: Quantity::ZERO,
            bid_price: Price::ZERO,
            bid_quantity: Quantity::ZERO,
            ask_price: Price::ZERO,
            ask_quantity: Quantity::ZERO,
            total_volume: 0,
            timestamp,
        }
    }
}
