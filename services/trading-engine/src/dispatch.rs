//! Intake dispatcher
//!
//! Decodes inbound order-intent messages and drives the matching core.
//! Wire prices are decimals and are converted to fixed point here, using
//! the configured scale. Bad messages are reported and dropped; the
//! dispatcher itself never stops.

use matching_engine::MatchingEngine;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};
use types::prelude::*;

/// Inbound message, dispatched on the `action` field
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum IntakeMessage {
    Place {
        #[serde(rename = "userId")]
        user_id: u64,
        symbol: String,
        side: Side,
        #[serde(rename = "type")]
        order_type: OrderType,
        /// Decimal price; required for limit orders
        #[serde(default)]
        price: Option<Decimal>,
        quantity: u64,
        #[serde(rename = "timeInForce", default)]
        time_in_force: TimeInForce,
    },
    Cancel {
        #[serde(rename = "orderId")]
        order_id: u64,
    },
}

pub struct Dispatcher {
    core: Arc<MatchingEngine>,
    price_scale: u32,
}

impl Dispatcher {
    pub fn new(core: Arc<MatchingEngine>, price_scale: u32) -> Self {
        Self { core, price_scale }
    }

    /// Process one raw intake message.
    pub fn handle(&self, raw: &str) {
        match serde_json::from_str::<IntakeMessage>(raw) {
            Ok(IntakeMessage::Place {
                user_id,
                symbol,
                side,
                order_type,
                price,
                quantity,
                time_in_force,
            }) => {
                let price = match order_type {
                    OrderType::Market => Price::ZERO,
                    OrderType::Limit => {
                        match price.and_then(|value| Price::from_decimal(value, self.price_scale)) {
                            Some(price) => price,
                            None => {
                                warn!(user_id, "limit order without a usable price");
                                self.core.report_error(
                                    EngineError::InvalidPrice(0),
                                    format!("place from user {user_id}"),
                                );
                                return;
                            }
                        }
                    }
                };

                let result = self.core.submit_order(
                    UserId::from_u64(user_id),
                    Symbol::new(symbol),
                    side,
                    order_type,
                    time_in_force,
                    price,
                    Quantity::from_raw(quantity),
                );
                debug!(
                    order_id = %result.order().order_id,
                    status = ?result.order().status,
                    fills = result.trades().len(),
                    "intake order dispatched"
                );
            }
            Ok(IntakeMessage::Cancel { order_id }) => {
                if let Err(error) = self.core.cancel_order(OrderId::from_u64(order_id)) {
                    warn!(order_id, %error, "intake cancel failed");
                }
            }
            Err(err) => {
                warn!(error = %err, "dropping malformed intake message");
                self.core.report_error(
                    EngineError::System(format!("malformed intake message: {err}")),
                    truncate(raw, 256),
                );
            }
        }
    }
}

fn truncate(raw: &str, max: usize) -> String {
    if raw.len() <= max {
        raw.to_string()
    } else {
        let head: String = raw.chars().take(max).collect();
        format!("{head}…")
    }
}
