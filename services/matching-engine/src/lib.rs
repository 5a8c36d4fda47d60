//! Matching engine core
//!
//! Multi-symbol limit-order-book matching with price-time priority,
//! coupled to a fund-locking balance ledger.
//!
//! **Key invariants:**
//! - Price-time priority strictly enforced; execution at the maker's price
//! - No resting book is ever crossed
//! - A user's locked balance is exactly the reservation of their live
//!   limit buy orders
//! - Order and trade ids are globally monotonic

pub mod book;
pub mod clock;
pub mod engine;
pub mod events;
pub mod ledger;
pub mod matching;
pub mod registry;

pub use engine::{MatchingEngine, SubmitResult};
pub use events::{EngineEvent, EventSink, NullSink};
