//! Event emitter
//!
//! Receives engine events on a bounded channel and fans them out to the
//! configured pub/sub channels as JSON. A single consumer thread preserves
//! the causal order the engine emitted in, which is exactly the per-symbol
//! ordering guarantee subscribers rely on. Trades and order updates are
//! also forwarded to the snapshot side-channel.

use chrono::Utc;
use matching_engine::{EngineEvent, EventSink};
use parking_lot::Mutex;
use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use tracing::{error, warn};

use crate::broker::Publisher;
use crate::config::ChannelConfig;
use crate::snapshot::SnapshotService;
use crate::wire;

/// Bound on in-flight events; the engine blocks rather than drop
const EVENT_QUEUE_DEPTH: usize = 1024;

pub struct Emitter {
    sender: Mutex<Option<SyncSender<EngineEvent>>>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl Emitter {
    pub fn start(
        channels: ChannelConfig,
        price_scale: u32,
        publishers: Vec<Arc<dyn Publisher>>,
        snapshots: Option<Arc<SnapshotService>>,
    ) -> Arc<Self> {
        let (sender, receiver) = mpsc::sync_channel(EVENT_QUEUE_DEPTH);
        let consumer =
            std::thread::spawn(move || consume(receiver, channels, price_scale, publishers, snapshots));

        Arc::new(Self {
            sender: Mutex::new(Some(sender)),
            consumer: Mutex::new(Some(consumer)),
        })
    }

    /// Drain outstanding events and stop the consumer.
    pub fn close(&self) {
        drop(self.sender.lock().take());
        if let Some(handle) = self.consumer.lock().take() {
            if handle.join().is_err() {
                error!("event consumer panicked");
            }
        }
    }
}

impl EventSink for Emitter {
    fn emit(&self, event: EngineEvent) {
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(sender) => {
                if sender.send(event).is_err() {
                    warn!("event channel disconnected; dropping event");
                }
            }
            None => warn!("emitter closed; dropping event"),
        }
    }
}

fn consume(
    receiver: Receiver<EngineEvent>,
    channels: ChannelConfig,
    price_scale: u32,
    publishers: Vec<Arc<dyn Publisher>>,
    snapshots: Option<Arc<SnapshotService>>,
) {
    for event in receiver {
        match event {
            EngineEvent::OrderUpdated(order) => {
                publish_json(
                    &publishers,
                    &channels.order_update_channel,
                    &wire::order_message(&order, price_scale),
                );
                if let Some(snapshots) = &snapshots {
                    snapshots.save_order(&order, price_scale);
                }
            }
            EngineEvent::TradeExecuted { trade, snapshot } => {
                publish_json(
                    &publishers,
                    &channels.trade_channel,
                    &wire::trade_message(&trade, price_scale),
                );
                publish_json(
                    &publishers,
                    &channels.market_data_channel,
                    &wire::tick_message(&snapshot, price_scale),
                );
                if let Some(snapshots) = &snapshots {
                    snapshots.save_trade(&trade, price_scale);
                }
            }
            EngineEvent::Error { error, context } => {
                warn!(code = error.code(), %error, context = %context, "engine error published");
                publish_json(
                    &publishers,
                    &channels.error_channel,
                    &wire::error_message(&error, &context, Utc::now().timestamp_millis()),
                );
            }
        }
    }
}

fn publish_json<T: serde::Serialize>(publishers: &[Arc<dyn Publisher>], channel: &str, message: &T) {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(err) => {
            error!(channel, error = %err, "event serialization failed");
            return;
        }
    };
    for publisher in publishers {
        if let Err(err) = publisher.publish(channel, &payload) {
            error!(channel, error = %err, "publish failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::MemoryPublisher;
    use types::prelude::*;

    #[test]
    fn test_events_reach_their_channels_in_order() {
        let publisher = Arc::new(MemoryPublisher::new());
        let emitter = Emitter::start(
            ChannelConfig::default(),
            2,
            vec![Arc::clone(&publisher) as Arc<dyn Publisher>],
            None,
        );

        let order = Order::new(
            OrderId::from_u64(1),
            UserId::from_u64(1),
            Symbol::new("X"),
            Side::Sell,
            OrderType::Limit,
            TimeInForce::Gfd,
            Price::from_raw(10_000),
            Quantity::from_raw(5),
            1,
        );
        let trade = Trade::new(
            TradeId::from_u64(1),
            OrderId::from_u64(2),
            OrderId::from_u64(1),
            UserId::from_u64(2),
            UserId::from_u64(1),
            Symbol::new("X"),
            Price::from_raw(10_000),
            Quantity::from_raw(5),
            2,
        );

        emitter.emit(EngineEvent::OrderUpdated(order));
        emitter.emit(EngineEvent::TradeExecuted {
            trade,
            snapshot: MarketSnapshot::empty(Symbol::new("X"), 2),
        });
        emitter.emit(EngineEvent::Error {
            error: EngineError::InvalidQuantity,
            context: "test".into(),
        });
        emitter.close();

        assert_eq!(publisher.on_channel("order_updates").len(), 1);
        assert_eq!(publisher.on_channel("trades").len(), 1);
        assert_eq!(publisher.on_channel("market_data").len(), 1);
        assert_eq!(publisher.on_channel("errors").len(), 1);

        // Trade publishes before its tick
        let all = publisher.messages();
        let trade_pos = all.iter().position(|(c, _)| c == "trades").unwrap();
        let tick_pos = all.iter().position(|(c, _)| c == "market_data").unwrap();
        assert!(trade_pos < tick_pos);
    }

    #[test]
    fn test_emit_after_close_is_dropped() {
        let publisher = Arc::new(MemoryPublisher::new());
        let emitter = Emitter::start(
            ChannelConfig::default(),
            2,
            vec![Arc::clone(&publisher) as Arc<dyn Publisher>],
            None,
        );
        emitter.close();

        emitter.emit(EngineEvent::Error {
            error: EngineError::InvalidQuantity,
            context: "late".into(),
        });
        assert!(publisher.on_channel("errors").is_empty());
    }
}
