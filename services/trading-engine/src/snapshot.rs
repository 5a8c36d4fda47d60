//! Snapshot side-channel
//!
//! Persists engine state as per-object JSON under stable keys:
//! `orderbook:<symbol>`, `order:<id>`, `balance:<user>`, `trade:<id>`.
//! Write failures are logged and reported, never fatal; recovery is a
//! separate concern outside this crate.

use matching_engine::MatchingEngine;
use std::sync::Arc;
use tracing::error;
use types::prelude::*;

use crate::broker::KeyValueStore;
use crate::wire;

pub struct SnapshotService {
    store: Arc<dyn KeyValueStore>,
}

impl SnapshotService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn save_order(&self, order: &Order, scale: u32) {
        let key = format!("order:{}", order.order_id);
        self.put_json(&key, &wire::order_message(order, scale));
    }

    pub fn save_trade(&self, trade: &Trade, scale: u32) {
        let key = format!("trade:{}", trade.trade_id);
        self.put_json(&key, &wire::trade_message(trade, scale));
    }

    pub fn save_balance(&self, balance: &UserBalance) {
        let key = format!("balance:{}", balance.user_id);
        self.put_json(&key, &wire::balance_message(balance));
    }

    pub fn save_book(&self, snapshot: &MarketSnapshot, scale: u32) {
        let key = format!("orderbook:{}", snapshot.symbol);
        self.put_json(&key, &wire::book_message(snapshot, scale));
    }

    /// Persist every book and balance. Read-only with respect to the
    /// engine; used by the periodic snapshot thread.
    pub fn snapshot_all(&self, engine: &MatchingEngine, scale: u32) {
        for symbol in engine.symbols() {
            if let Some(snapshot) = engine.market_snapshot(&symbol) {
                self.save_book(&snapshot, scale);
            }
        }
        for balance in engine.balances() {
            self.save_balance(&balance);
        }
    }

    fn put_json<T: serde::Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(payload) => {
                if let Err(err) = self.store.put(key, payload) {
                    error!(key, error = %err, "snapshot write failed");
                }
            }
            Err(err) => error!(key, error = %err, "snapshot serialization failed"),
        }
    }
}
