//! Price level with FIFO time priority
//!
//! Orders at one price are matched in arrival order. Removal by id must be
//! O(1), so the level keeps an id-keyed entry map beside the arrival queue;
//! removing an order drops its entry and leaves a stale id in the queue,
//! which `front` skips lazily.

use std::collections::{HashMap, VecDeque};
use types::prelude::*;

/// One resting order's slot in a level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelEntry {
    pub user_id: UserId,
    pub remaining: Quantity,
}

/// Outcome of filling the front order of a level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontFill {
    pub order_id: OrderId,
    /// True when the maker was fully consumed and left the level
    pub exhausted: bool,
}

/// Time-ordered orders at a single price.
#[derive(Debug, Default)]
pub struct PriceLevel {
    queue: VecDeque<OrderId>,
    entries: HashMap<OrderId, LevelEntry>,
    total_unfilled: u64,
}

impl PriceLevel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an order at the back of the queue (time priority)
    pub fn push_back(&mut self, order_id: OrderId, user_id: UserId, remaining: Quantity) {
        self.queue.push_back(order_id);
        self.entries.insert(order_id, LevelEntry { user_id, remaining });
        self.total_unfilled += remaining.raw();
    }

    /// Remove an order by id in O(1).
    ///
    /// Returns the remaining quantity it held, or `None` if absent.
    pub fn remove(&mut self, order_id: OrderId) -> Option<Quantity> {
        let entry = self.entries.remove(&order_id)?;
        self.total_unfilled -= entry.remaining.raw();
        Some(entry.remaining)
    }

    /// Front (oldest live) order of the level.
    ///
    /// Skips ids whose entries were removed since they were queued.
    pub fn front(&mut self) -> Option<(OrderId, UserId, Quantity)> {
        while let Some(order_id) = self.queue.front().copied() {
            match self.entries.get(&order_id) {
                Some(entry) => return Some((order_id, entry.user_id, entry.remaining)),
                None => {
                    self.queue.pop_front();
                }
            }
        }
        None
    }

    /// Reduce the front order by `quantity`, removing it when exhausted.
    pub fn fill_front(&mut self, quantity: Quantity) -> Option<FrontFill> {
        let (order_id, _, remaining) = self.front()?;
        debug_assert!(quantity <= remaining);

        self.total_unfilled -= quantity.raw();
        if quantity == remaining {
            self.entries.remove(&order_id);
            self.queue.pop_front();
            Some(FrontFill { order_id, exhausted: true })
        } else {
            if let Some(entry) = self.entries.get_mut(&order_id) {
                entry.remaining = remaining - quantity;
            }
            Some(FrontFill { order_id, exhausted: false })
        }
    }

    /// Sum of unfilled quantity across live orders
    pub fn total_unfilled(&self) -> Quantity {
        Quantity::from_raw(self.total_unfilled)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
