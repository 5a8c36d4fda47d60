//! Error taxonomy for the matching engine
//!
//! Validation errors are returned to the caller and published on the error
//! channel. `System` denotes an internal invariant violation: it is logged
//! and reported, but the engine keeps running.

use crate::ids::OrderId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine-wide error taxonomy
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineError {
    #[error("symbol must be non-empty")]
    InvalidSymbol,

    #[error("quantity must be positive")]
    InvalidQuantity,

    #[error("invalid limit price: {0}")]
    InvalidPrice(i64),

    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("duplicate order id: {0}")]
    DuplicateOrder(OrderId),

    #[error("system error: {0}")]
    System(String),
}

impl EngineError {
    /// Stable wire code for the error channel
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidSymbol => "INVALID_SYMBOL",
            EngineError::InvalidQuantity => "INVALID_QUANTITY",
            EngineError::InvalidPrice(_) => "INVALID_PRICE",
            EngineError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            EngineError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            EngineError::DuplicateOrder(_) => "DUPLICATE_ORDER",
            EngineError::System(_) => "SYSTEM_ERROR",
        }
    }
}
