//! Crossing detection
//!
//! A buy crosses a sell when the bid price is at least the ask price.
//! Market orders cross any maker.

use types::prelude::*;

/// Check if an incoming (taker) order crosses a resting maker price.
///
/// Limit orders are constrained by their own price; market orders are not.
pub fn taker_crosses(
    side: Side,
    order_type: OrderType,
    limit_price: Price,
    maker_price: Price,
) -> bool {
    match order_type {
        OrderType::Market => true,
        OrderType::Limit => match side {
            Side::Buy => limit_price >= maker_price,
            Side::Sell => limit_price <= maker_price,
        },
    }
}
