//! Balance ledger
//!
//! Per-user available/locked balances with lock, unlock, transfer, and
//! trade-settlement primitives. Every operation runs under one exclusion
//! lock; settlement of a single fill is one critical section, so no
//! observer can see the buyer debited without the seller credited.

use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::error;
use types::prelude::*;

/// Thread-safe fund ledger.
///
/// Unknown users materialize with a zero balance on first touch.
#[derive(Debug, Default)]
pub struct BalanceLedger {
    balances: Mutex<HashMap<UserId, UserBalance>>,
}

impl BalanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a user's balance to `amount` available, zero locked, overwriting
    /// any prior state.
    pub fn initialize(&self, user_id: UserId, amount: i64) {
        let mut balances = self.balances.lock();
        balances.insert(user_id, UserBalance::new(user_id, amount));
    }

    /// Current balance for a user (zero if never seen)
    pub fn balance(&self, user_id: UserId) -> UserBalance {
        let balances = self.balances.lock();
        balances
            .get(&user_id)
            .copied()
            .unwrap_or_else(|| UserBalance::new(user_id, 0))
    }

    /// All known balances, for the snapshot side-channel
    pub fn balances(&self) -> Vec<UserBalance> {
        let balances = self.balances.lock();
        balances.values().copied().collect()
    }

    pub fn has_available(&self, user_id: UserId, amount: i64) -> bool {
        self.balance(user_id).available >= amount
    }

    /// Move `amount` from available to locked.
    pub fn lock(&self, user_id: UserId, amount: i64) -> Result<(), EngineError> {
        let mut balances = self.balances.lock();
        let balance = entry(&mut balances, user_id);

        if balance.available < amount {
            return Err(EngineError::InsufficientBalance {
                required: amount,
                available: balance.available,
            });
        }

        balance.available -= amount;
        balance.locked += amount;
        Ok(())
    }

    /// Move `amount` from locked back to available.
    ///
    /// Unlocking more than is locked is an invariant violation, reported as
    /// `System` and leaving the balance untouched.
    pub fn unlock(&self, user_id: UserId, amount: i64) -> Result<(), EngineError> {
        let mut balances = self.balances.lock();
        let balance = entry(&mut balances, user_id);

        if balance.locked < amount {
            error!(
                user_id = user_id.as_u64(),
                locked = balance.locked,
                amount,
                "unlock exceeds locked balance"
            );
            return Err(EngineError::System(format!(
                "unlock of {amount} exceeds locked balance {}",
                balance.locked
            )));
        }

        balance.locked -= amount;
        balance.available += amount;
        Ok(())
    }

    /// Move `amount` between the available balances of two users.
    pub fn transfer(&self, from: UserId, to: UserId, amount: i64) -> Result<(), EngineError> {
        let mut balances = self.balances.lock();

        let source = entry(&mut balances, from);
        if source.available < amount {
            return Err(EngineError::InsufficientBalance {
                required: amount,
                available: source.available,
            });
        }
        source.available -= amount;

        let target = entry(&mut balances, to);
        target.available += amount;
        Ok(())
    }

    /// Release a reservation after a fill: `locked_portion` leaves the
    /// locked balance and the unspent part (`locked_portion - actual_cost`)
    /// returns to available. Requires `actual_cost <= locked_portion`.
    pub fn complete_trade(
        &self,
        user_id: UserId,
        locked_portion: i64,
        actual_cost: i64,
    ) -> Result<(), EngineError> {
        let mut balances = self.balances.lock();
        release_reservation(&mut balances, user_id, locked_portion, actual_cost)
    }

    /// Settle one fill atomically: the buyer's reservation for the filled
    /// units is consumed (price improvement refunded to available) and the
    /// executed value is credited to the seller, all in one critical
    /// section. Self-trades settle against the same balance and net out.
    pub fn settle_fill(
        &self,
        buyer: UserId,
        locked_portion: i64,
        cost: i64,
        seller: UserId,
    ) -> Result<(), EngineError> {
        let mut balances = self.balances.lock();
        release_reservation(&mut balances, buyer, locked_portion, cost)?;
        let target = entry(&mut balances, seller);
        target.available += cost;
        Ok(())
    }

    /// Funds that must be locked before the order may be accepted.
    ///
    /// Only limit buys pre-lock (`price × quantity`). Sells carry no
    /// inventory reservation and market buys are reserved separately
    /// against walked book depth.
    pub fn required_funds(&self, order: &Order) -> i64 {
        match (order.side, order.order_type) {
            (Side::Buy, OrderType::Limit) => order.price.notional(order.quantity).unwrap_or(i64::MAX),
            _ => 0,
        }
    }
}

fn entry(balances: &mut HashMap<UserId, UserBalance>, user_id: UserId) -> &mut UserBalance {
    balances
        .entry(user_id)
        .or_insert_with(|| UserBalance::new(user_id, 0))
}

fn release_reservation(
    balances: &mut HashMap<UserId, UserBalance>,
    user_id: UserId,
    locked_portion: i64,
    actual_cost: i64,
) -> Result<(), EngineError> {
    let balance = entry(balances, user_id);

    if balance.locked < locked_portion {
        error!(
            user_id = user_id.as_u64(),
            locked = balance.locked,
            locked_portion,
            "settlement exceeds locked balance"
        );
        return Err(EngineError::System(format!(
            "settlement of {locked_portion} exceeds locked balance {}",
            balance.locked
        )));
    }

    balance.locked -= locked_portion;
    balance.available += locked_portion - actual_cost;
    Ok(())
}
