//! Broker interfaces
//!
//! The engine consumes an intake queue and publishes to pub/sub channels
//! and a key-value store; the concrete broker client lives outside this
//! workspace. These traits are the seams, with in-memory implementations
//! for tests and in-process embedding.

use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("broker unavailable: {0}")]
    Unavailable(String),
}

/// FIFO queue of inbound order messages.
pub trait IntakeQueue: Send + Sync {
    fn push(&self, message: String) -> Result<(), BrokerError>;

    /// Blocking pop with a bounded timeout so shutdown stays responsive.
    fn pop(&self, timeout: Duration) -> Option<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pub/sub sink for outbound engine events.
pub trait Publisher: Send + Sync {
    fn publish(&self, channel: &str, payload: &str) -> Result<(), BrokerError>;
}

/// Key-value store for the snapshot side-channel.
pub trait KeyValueStore: Send + Sync {
    fn put(&self, key: &str, value: String) -> Result<(), BrokerError>;
}

/// In-process intake queue
#[derive(Default)]
pub struct MemoryQueue {
    messages: Mutex<VecDeque<String>>,
    available: Condvar,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IntakeQueue for MemoryQueue {
    fn push(&self, message: String) -> Result<(), BrokerError> {
        self.messages.lock().push_back(message);
        self.available.notify_one();
        Ok(())
    }

    fn pop(&self, timeout: Duration) -> Option<String> {
        let mut messages = self.messages.lock();
        if messages.is_empty() {
            self.available.wait_for(&mut messages, timeout);
        }
        messages.pop_front()
    }

    fn len(&self) -> usize {
        self.messages.lock().len()
    }
}

/// In-process publisher that records every message
#[derive(Default)]
pub struct MemoryPublisher {
    messages: Mutex<Vec<(String, String)>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// All (channel, payload) pairs in publish order
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().clone()
    }

    /// Payloads published on one channel, in order
    pub fn on_channel(&self, channel: &str) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|(name, _)| name == channel)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

impl Publisher for MemoryPublisher {
    fn publish(&self, channel: &str, payload: &str) -> Result<(), BrokerError> {
        self.messages
            .lock()
            .push((channel.to_string(), payload.to_string()));
        Ok(())
    }
}

/// In-process key-value store
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn put(&self, key: &str, value: String) -> Result<(), BrokerError> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }
}
