//! Trade execution records

use crate::ids::{OrderId, Symbol, TradeId, UserId};
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// An executed fill between a buy and a sell order.
///
/// Immutable once emitted. The price is always the resting (maker) order's
/// price; quantity and price are both positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub buy_user_id: UserId,
    pub sell_user_id: UserId,
    pub symbol: Symbol,
    pub price: Price,
    pub quantity: Quantity,
    /// Engine clock milliseconds
    pub executed_at: i64,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trade_id: TradeId,
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        buy_user_id: UserId,
        sell_user_id: UserId,
        symbol: Symbol,
        price: Price,
        quantity: Quantity,
        executed_at: i64,
    ) -> Self {
        Self {
            trade_id,
            buy_order_id,
            sell_order_id,
            buy_user_id,
            sell_user_id,
            symbol,
            price,
            quantity,
            executed_at,
        }
    }

    /// Executed value of the trade (`price × quantity`).
    ///
    /// Returns `None` on 64-bit overflow.
    pub fn notional(&self) -> Option<i64> {
        self.price.notional(self.quantity)
    }
}
