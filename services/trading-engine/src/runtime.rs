//! Engine runtime
//!
//! Owns the worker threads: N intake dispatchers pulling from the broker
//! queue and an optional periodic snapshot thread. Shutdown is cooperative;
//! workers observe the running flag after their current queue wait and an
//! order being matched always completes.

use matching_engine::{EventSink, MatchingEngine, SubmitResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info};
use types::prelude::*;

use crate::broker::{IntakeQueue, KeyValueStore, Publisher};
use crate::config::EngineConfig;
use crate::dispatch::Dispatcher;
use crate::emitter::Emitter;
use crate::snapshot::SnapshotService;
use crate::wire;

/// How long an intake worker blocks on the queue before rechecking the
/// running flag
const INTAKE_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// How often the snapshot thread rechecks the running flag while waiting
/// out its interval
const SNAPSHOT_POLL_STEP: Duration = Duration::from_millis(200);

pub struct TradingEngine {
    config: EngineConfig,
    core: Arc<MatchingEngine>,
    intake: Arc<dyn IntakeQueue>,
    emitter: Arc<Emitter>,
    snapshots: Option<Arc<SnapshotService>>,
    running: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TradingEngine {
    pub fn new(
        config: EngineConfig,
        intake: Arc<dyn IntakeQueue>,
        publishers: Vec<Arc<dyn Publisher>>,
        store: Option<Arc<dyn KeyValueStore>>,
    ) -> Self {
        let snapshots = store.map(|store| Arc::new(SnapshotService::new(store)));
        let emitter = Emitter::start(
            config.channels.clone(),
            config.price_scale,
            publishers,
            snapshots.clone(),
        );
        let core = Arc::new(MatchingEngine::new(
            Arc::clone(&emitter) as Arc<dyn EventSink>
        ));

        Self {
            config,
            core,
            intake,
            emitter,
            snapshots,
            running: Arc::new(AtomicBool::new(false)),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the intake workers and, when enabled, the snapshot thread.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let worker_count = self.config.intake_workers.max(1);
        let mut workers = self.workers.lock();

        for worker in 0..worker_count {
            let running = Arc::clone(&self.running);
            let intake = Arc::clone(&self.intake);
            let dispatcher = Dispatcher::new(Arc::clone(&self.core), self.config.price_scale);
            workers.push(std::thread::spawn(move || {
                debug!(worker, "intake worker started");
                while running.load(Ordering::SeqCst) {
                    if let Some(message) = intake.pop(INTAKE_POLL_TIMEOUT) {
                        dispatcher.handle(&message);
                    }
                }
                debug!(worker, "intake worker stopped");
            }));
        }

        if self.config.snapshot_enabled {
            if let Some(snapshots) = self.snapshots.clone() {
                let running = Arc::clone(&self.running);
                let core = Arc::clone(&self.core);
                let interval = Duration::from_secs(self.config.snapshot_interval_seconds.max(1));
                let scale = self.config.price_scale;
                workers.push(std::thread::spawn(move || {
                    let mut waited = Duration::ZERO;
                    while running.load(Ordering::SeqCst) {
                        std::thread::sleep(SNAPSHOT_POLL_STEP);
                        waited += SNAPSHOT_POLL_STEP;
                        if waited >= interval {
                            snapshots.snapshot_all(&core, scale);
                            waited = Duration::ZERO;
                        }
                    }
                }));
            }
        }

        info!(workers = worker_count, "trading engine started");
    }

    /// Lower the running flag, join every worker, and drain the emitter.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        for handle in self.workers.lock().drain(..) {
            let _ = handle.join();
        }
        self.emitter.close();
        info!("trading engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // ── Direct API (testing and embedding) ──────────────────────────

    #[allow(clippy::too_many_arguments)]
    pub fn submit_order(
        &self,
        user_id: UserId,
        symbol: Symbol,
        side: Side,
        order_type: OrderType,
        time_in_force: TimeInForce,
        price: Price,
        quantity: Quantity,
    ) -> SubmitResult {
        self.core
            .submit_order(user_id, symbol, side, order_type, time_in_force, price, quantity)
    }

    pub fn cancel_order(&self, order_id: OrderId) -> Result<Order, EngineError> {
        self.core.cancel_order(order_id)
    }

    pub fn order_status(&self, order_id: OrderId) -> Option<Order> {
        self.core.order_status(order_id)
    }

    pub fn user_orders(&self, user_id: UserId) -> Vec<Order> {
        self.core.user_orders(user_id)
    }

    pub fn market_snapshot(&self, symbol: &Symbol) -> Option<MarketSnapshot> {
        self.core.market_snapshot(symbol)
    }

    /// Order-book depth as the wire JSON document
    pub fn depth_json(&self, symbol: &Symbol, levels: usize) -> Option<serde_json::Value> {
        let (bids, asks) = self.core.depth(symbol, levels)?;
        let message = wire::order_book_message(
            symbol,
            &bids,
            &asks,
            self.config.price_scale,
            chrono::Utc::now().timestamp_millis(),
        );
        serde_json::to_value(message).ok()
    }

    /// Seed a user's balance, persisting it when snapshots are configured
    pub fn initialize_balance(&self, user_id: UserId, amount: i64) {
        self.core.initialize_balance(user_id, amount);
        if let Some(snapshots) = &self.snapshots {
            snapshots.save_balance(&self.core.balance(user_id));
        }
    }

    pub fn balance(&self, user_id: UserId) -> UserBalance {
        self.core.balance(user_id)
    }
}

impl Drop for TradingEngine {
    fn drop(&mut self) {
        self.stop();
        // Covers the never-started case, where stop() returns early
        self.emitter.close();
    }
}
