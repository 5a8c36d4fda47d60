//! Ask (sell-side) ladder
//!
//! Mirror of the bid ladder with the opposite ordering: the best ask is the
//! lowest price, i.e. the first BTreeMap key.

use std::collections::BTreeMap;
use types::prelude::*;

use super::price_level::PriceLevel;

#[derive(Debug, Default)]
pub struct AskBook {
    levels: BTreeMap<Price, PriceLevel>,
}

impl AskBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, price: Price, order_id: OrderId, user_id: UserId, remaining: Quantity) {
        self.levels
            .entry(price)
            .or_default()
            .push_back(order_id, user_id, remaining);
    }

    /// Remove an order; prunes the level when it becomes empty.
    pub fn remove(&mut self, order_id: OrderId, price: Price) -> bool {
        let Some(level) = self.levels.get_mut(&price) else {
            return false;
        };
        if level.remove(order_id).is_none() {
            return false;
        }
        if level.is_empty() {
            self.levels.remove(&price);
        }
        true
    }

    /// Lowest ask price and its aggregate unfilled quantity
    pub fn best(&self) -> Option<(Price, Quantity)> {
        self.levels
            .iter()
            .next()
            .map(|(price, level)| (*price, level.total_unfilled()))
    }

    pub(crate) fn best_level_mut(&mut self) -> Option<(Price, &mut PriceLevel)> {
        self.levels
            .iter_mut()
            .next()
            .map(|(price, level)| (*price, level))
    }

    /// Drop a level that no longer holds live orders
    pub(crate) fn prune(&mut self, price: Price) {
        if self.levels.get(&price).is_some_and(|level| level.is_empty()) {
            self.levels.remove(&price);
        }
    }

    /// Top `depth` levels, best first
    pub fn depth(&self, depth: usize) -> Vec<(Price, Quantity)> {
        self.levels
            .iter()
            .take(depth)
            .map(|(price, level)| (*price, level.total_unfilled()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}
