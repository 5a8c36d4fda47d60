//! Order lifecycle types

use crate::ids::{OrderId, Symbol, UserId};
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    Buy,
    /// Sell order (ask)
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Execute at the limit price or better; residual may rest
    Limit,
    /// Execute against the best available price; never rests
    Market,
}

/// Time-in-force policy
///
/// Governs what happens to unfilled quantity after the match loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// Good-For-Day: unfilled residual rests on the book
    Gfd,
    /// Immediate-Or-Cancel: match what is available, cancel the rest
    Ioc,
    /// Fill-Or-Kill: match completely or not at all
    Fok,
}

impl Default for TimeInForce {
    fn default() -> Self {
        TimeInForce::Gfd
    }
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Accepted, no fills yet
    Pending,
    /// Some quantity filled, some outstanding
    PartiallyFilled,
    /// Completely filled (terminal)
    Filled,
    /// Cancelled by user or policy (terminal)
    Cancelled,
    /// Failed validation or funding (terminal)
    Rejected,
}

impl OrderStatus {
    /// Check if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

/// A single order as tracked by the registry.
///
/// Invariants: `filled_quantity <= quantity`; status is `Filled` iff
/// filled equals total; terminal statuses never transition further.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    /// Limit price; `Price::ZERO` for market orders
    pub price: Price,
    pub quantity: Quantity,
    pub filled_quantity: Quantity,
    pub status: OrderStatus,
    /// Engine clock milliseconds; doubles as the time-priority key
    pub created_at: i64,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: OrderId,
        user_id: UserId,
        symbol: Symbol,
        side: Side,
        order_type: OrderType,
        time_in_force: TimeInForce,
        price: Price,
        quantity: Quantity,
        created_at: i64,
    ) -> Self {
        Self {
            order_id,
            user_id,
            symbol,
            side,
            order_type,
            time_in_force,
            price,
            quantity,
            filled_quantity: Quantity::ZERO,
            status: OrderStatus::Pending,
            created_at,
        }
    }

    /// Unfilled quantity
    pub fn remaining(&self) -> Quantity {
        self.quantity - self.filled_quantity
    }

    pub fn is_filled(&self) -> bool {
        self.filled_quantity == self.quantity
    }

    pub fn has_fills(&self) -> bool {
        !self.filled_quantity.is_zero()
    }

    /// Record a fill and transition the status accordingly.
    ///
    /// # Panics
    /// Panics if the fill would exceed the order quantity.
    pub fn add_fill(&mut self, fill_quantity: Quantity) {
        let new_filled = self.filled_quantity + fill_quantity;
        assert!(
            new_filled <= self.quantity,
            "fill would exceed order quantity"
        );

        self.filled_quantity = new_filled;
        self.status = if self.is_filled() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
    }
}
