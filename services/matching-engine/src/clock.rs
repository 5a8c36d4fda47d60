//! Strictly monotonic engine clock
//!
//! Timestamps are wall-clock milliseconds, bumped by one whenever the wall
//! clock has not advanced since the previous reading. Strict monotonicity
//! is what makes timestamps usable as the time-priority key.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug)]
pub struct EngineClock {
    last: AtomicI64,
}

impl EngineClock {
    pub fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }

    /// Next timestamp in milliseconds, strictly greater than any previous one
    pub fn now_ms(&self) -> i64 {
        let wall = Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = wall.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(observed) => prev = observed,
            }
        }
    }
}

impl Default for EngineClock {
    fn default() -> Self {
        Self::new()
    }
}
