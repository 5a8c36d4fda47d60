//! Engine event fan-out
//!
//! The engine pushes every state transition through an [`EventSink`]: maker
//! and taker order updates, executed trades with the resulting top-of-book,
//! and reportable errors. Sink calls happen in causal order while the
//! symbol's book lock is held, so a single-consumer sink observes per-symbol
//! event order exactly as the book evolved.

use serde::{Deserialize, Serialize};
use types::prelude::*;

/// Events emitted by the matching engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// An order changed state (fill, rest, cancel, reject)
    OrderUpdated(Order),

    /// A trade executed; the snapshot is the book immediately after it
    TradeExecuted {
        trade: Trade,
        snapshot: MarketSnapshot,
    },

    /// A reportable error (validation failure or invariant violation)
    Error { error: EngineError, context: String },
}

/// Receiver of engine events.
///
/// Implementations must be cheap and non-blocking relative to matching;
/// slow sinks should hand off to their own queue.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Sink that drops every event
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: EngineEvent) {}
}
