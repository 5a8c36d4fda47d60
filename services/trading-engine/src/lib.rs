//! Trading engine runtime
//!
//! The shell around the matching core: intake workers consuming order
//! messages from a broker queue, an event emitter fanning trades, order
//! updates, ticks, and errors out to pub/sub channels, and a periodic
//! snapshot side-channel. Broker implementations are external; this crate
//! defines the seams and ships in-memory stand-ins for tests and embedding.

pub mod broker;
pub mod config;
pub mod dispatch;
pub mod emitter;
pub mod runtime;
pub mod snapshot;
pub mod wire;

pub use config::EngineConfig;
pub use runtime::TradingEngine;
