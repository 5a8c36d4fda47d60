//! User balance types
//!
//! Balances are a single fungible fixed-point amount per user, split into
//! an available (spendable) part and a locked part reserved for resting
//! buy orders.

use crate::ids::UserId;
use serde::{Deserialize, Serialize};

/// Per-user balance.
///
/// Invariant: both components are non-negative, and `locked` equals the sum
/// of `limit_price × unfilled` over the user's live limit buy orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBalance {
    pub user_id: UserId,
    pub available: i64,
    pub locked: i64,
}

impl UserBalance {
    pub fn new(user_id: UserId, available: i64) -> Self {
        Self {
            user_id,
            available,
            locked: 0,
        }
    }

    /// Total value owned by the user
    pub fn total(&self) -> i64 {
        self.available + self.locked
    }
}
