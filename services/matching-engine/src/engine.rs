//! Matching engine core
//!
//! Coordinates the registry, ledger, and per-symbol books for order
//! submission and cancellation. The engine owns no market data directly;
//! it composes the other services and drives the match loop.
//!
//! Locking: each book has its own mutex, held for the entire processing of
//! one incoming order so no other worker can observe a crossed or mid-fill
//! book. The ledger and registry locks are only ever taken while the book
//! lock is held (book first), never the other way around.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use types::prelude::*;

use crate::book::OrderBook;
use crate::clock::EngineClock;
use crate::events::{EngineEvent, EventSink};
use crate::ledger::BalanceLedger;
use crate::matching::{crossing, TradeExecutor};
use crate::registry::OrderRegistry;

/// Ladder depth walked for FOK feasibility checks and market-buy reservations
const DEPTH_WALK_LIMIT: usize = 100;

/// Outcome of submitting an order
#[derive(Debug)]
pub enum SubmitResult {
    /// Failed validation or funding; never entered the engine
    Rejected { order: Order, error: EngineError },
    /// Cancelled by policy with no fills (FOK miss, IOC/market no liquidity)
    Cancelled { order: Order },
    /// Rested on the book with no fills
    Resting { order: Order },
    /// Some fills; residual rested (GFD) or was released (IOC/market)
    PartiallyFilled { order: Order, trades: Vec<Trade> },
    /// Completely filled
    Filled { order: Order, trades: Vec<Trade> },
}

impl SubmitResult {
    pub fn order(&self) -> &Order {
        match self {
            SubmitResult::Rejected { order, .. }
            | SubmitResult::Cancelled { order }
            | SubmitResult::Resting { order }
            | SubmitResult::PartiallyFilled { order, .. }
            | SubmitResult::Filled { order, .. } => order,
        }
    }

    pub fn trades(&self) -> &[Trade] {
        match self {
            SubmitResult::PartiallyFilled { trades, .. } | SubmitResult::Filled { trades, .. } => {
                trades
            }
            _ => &[],
        }
    }
}

/// Reservation taken for an incoming order before it matches
enum Funding {
    /// Sell orders reserve nothing
    None,
    /// Limit buy: `limit price × quantity` locked up front
    Limit,
    /// Market buy: cost of the fillable quantity locked against walked
    /// depth; drains as fills settle
    Market { remaining: i64 },
}

pub struct MatchingEngine {
    ledger: Arc<BalanceLedger>,
    registry: OrderRegistry,
    books: DashMap<Symbol, Arc<Mutex<OrderBook>>>,
    executor: TradeExecutor,
    clock: EngineClock,
    sink: Arc<dyn EventSink>,
}

impl MatchingEngine {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        let ids = Arc::new(IdAllocator::new());
        let ledger = Arc::new(BalanceLedger::new());
        Self {
            registry: OrderRegistry::new(Arc::clone(&ids)),
            executor: TradeExecutor::new(Arc::clone(&ids), Arc::clone(&ledger)),
            books: DashMap::new(),
            clock: EngineClock::new(),
            ledger,
            sink,
        }
    }

    /// Submit an order: validate, reserve funds, match, apply the
    /// time-in-force policy to any residual.
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
        let created_at = self.clock.now_ms();
        let mut order = match self.registry.create(
            user_id,
            symbol,
            side,
            order_type,
            time_in_force,
            price,
            quantity,
            created_at,
        ) {
            Ok(order) => order,
            Err(rejected) => {
                warn!(
                    user_id = user_id.as_u64(),
                    error = %rejected.error,
                    "order failed validation"
                );
                self.report_error(
                    rejected.error.clone(),
                    format!("order {} rejected", rejected.order.order_id),
                );
                return SubmitResult::Rejected {
                    order: rejected.order,
                    error: rejected.error,
                };
            }
        };

        let book_ref = self.book(&order.symbol);
        let mut book = book_ref.lock();

        let mut funding = match self.reserve_funds(&order, &book) {
            Ok(funding) => funding,
            Err(error) => {
                order.status = OrderStatus::Rejected;
                warn!(order_id = %order.order_id, error = %error, "order funding failed");
                self.report_error(error.clone(), format!("order {} rejected", order.order_id));
                return SubmitResult::Rejected { order, error };
            }
        };

        if let Err(error) = self.registry.insert(&order) {
            self.unlock_prefill(&order, &funding);
            order.status = OrderStatus::Rejected;
            self.report_error(error.clone(), format!("order {} rejected", order.order_id));
            return SubmitResult::Rejected { order, error };
        }

        // FOK feasibility runs before any fill: all or nothing.
        if order.time_in_force == TimeInForce::Fok && !self.can_fill_completely(&order, &book) {
            self.unlock_prefill(&order, &funding);
            let order = self.cancel_in_registry(order);
            debug!(order_id = %order.order_id, "fill-or-kill order killed");
            self.sink.emit(EngineEvent::OrderUpdated(order.clone()));
            return SubmitResult::Cancelled { order };
        }

        let trades = self.match_incoming(&mut order, &mut book, &mut funding);
        self.settle_residual(&mut order, &mut book, &funding);

        self.sink.emit(EngineEvent::OrderUpdated(order.clone()));
        drop(book);

        debug!(
            order_id = %order.order_id,
            fills = trades.len(),
            status = ?order.status,
            "order processed"
        );

        if order.status == OrderStatus::Cancelled {
            SubmitResult::Cancelled { order }
        } else if order.is_filled() {
            SubmitResult::Filled { order, trades }
        } else if order.has_fills() {
            SubmitResult::PartiallyFilled { order, trades }
        } else {
            SubmitResult::Resting { order }
        }
    }

    /// Cancel a resting order: remove it from its book, release the
    /// buyer's remaining reservation, mark it cancelled.
    pub fn cancel_order(&self, order_id: OrderId) -> Result<Order, EngineError> {
        let Some(order) = self.registry.get(order_id) else {
            let error = EngineError::OrderNotFound(order_id);
            self.report_error(error.clone(), format!("cancel {order_id}"));
            return Err(error);
        };

        let book_ref = match self.books.get(&order.symbol) {
            Some(entry) => Arc::clone(entry.value()),
            None => {
                let error = EngineError::System(format!("order {order_id} is not active"));
                self.report_error(error.clone(), format!("cancel {order_id}"));
                return Err(error);
            }
        };

        let mut book = book_ref.lock();
        if !book.remove(order_id) {
            let error = EngineError::System(format!("order {order_id} is not active"));
            self.report_error(error.clone(), format!("cancel {order_id}"));
            return Err(error);
        }

        let cancelled = self.registry.cancel(order_id)?;

        if cancelled.side == Side::Buy && cancelled.order_type == OrderType::Limit {
            let residual = cancelled
                .price
                .notional(cancelled.remaining())
                .unwrap_or(0);
            if residual > 0 {
                if let Err(error) = self.ledger.unlock(cancelled.user_id, residual) {
                    self.report_error(error, format!("cancel {order_id}"));
                }
            }
        }

        self.sink.emit(EngineEvent::OrderUpdated(cancelled.clone()));
        drop(book);

        info!(order_id = %order_id, "order cancelled");
        Ok(cancelled)
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub fn order_status(&self, order_id: OrderId) -> Option<Order> {
        self.registry.get(order_id)
    }

    pub fn user_orders(&self, user_id: UserId) -> Vec<Order> {
        self.registry.user_orders(user_id)
    }

    pub fn active_orders(&self, symbol: &Symbol) -> Vec<Order> {
        self.registry.active_by_symbol(symbol)
    }

    /// Top-of-book snapshot; `None` for symbols never traded
    pub fn market_snapshot(&self, symbol: &Symbol) -> Option<MarketSnapshot> {
        let book_ref = self.books.get(symbol).map(|entry| Arc::clone(entry.value()))?;
        let timestamp = self.clock.now_ms();
        let book = book_ref.lock();
        Some(book.snapshot(timestamp))
    }

    /// Aggregated (price, quantity) ladders up to `depth` levels each
    #[allow(clippy::type_complexity)]
    pub fn depth(
        &self,
        symbol: &Symbol,
        depth: usize,
    ) -> Option<(Vec<(Price, Quantity)>, Vec<(Price, Quantity)>)> {
        let book_ref = self.books.get(symbol).map(|entry| Arc::clone(entry.value()))?;
        let book = book_ref.lock();
        Some((book.bid_depth(depth), book.ask_depth(depth)))
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.books.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn initialize_balance(&self, user_id: UserId, amount: i64) {
        self.ledger.initialize(user_id, amount);
        info!(user_id = user_id.as_u64(), amount, "balance initialized");
    }

    pub fn balance(&self, user_id: UserId) -> UserBalance {
        self.ledger.balance(user_id)
    }

    pub fn balances(&self) -> Vec<UserBalance> {
        self.ledger.balances()
    }

    /// Publish an error on the event stream (also used by the dispatcher
    /// for decode failures)
    pub fn report_error(&self, error: EngineError, context: impl Into<String>) {
        self.sink.emit(EngineEvent::Error {
            error,
            context: context.into(),
        });
    }

    // ── Internals ───────────────────────────────────────────────────

    fn book(&self, symbol: &Symbol) -> Arc<Mutex<OrderBook>> {
        self.books
            .entry(symbol.clone())
            .or_insert_with(|| Arc::new(Mutex::new(OrderBook::new(symbol.clone()))))
            .clone()
    }

    fn reserve_funds(&self, order: &Order, book: &OrderBook) -> Result<Funding, EngineError> {
        if order.side == Side::Sell {
            return Ok(Funding::None);
        }
        match order.order_type {
            OrderType::Limit => {
                let required = self.ledger.required_funds(order);
                self.ledger.lock(order.user_id, required)?;
                Ok(Funding::Limit)
            }
            OrderType::Market => {
                let cost = market_buy_reservation(order, book);
                if cost > 0 {
                    self.ledger.lock(order.user_id, cost)?;
                }
                Ok(Funding::Market { remaining: cost })
            }
        }
    }

    /// Release the whole reservation of an order that has not filled yet
    fn unlock_prefill(&self, order: &Order, funding: &Funding) {
        let amount = match funding {
            Funding::None => 0,
            Funding::Limit => order.price.notional(order.quantity).unwrap_or(0),
            Funding::Market { remaining } => *remaining,
        };
        if amount > 0 {
            if let Err(error) = self.ledger.unlock(order.user_id, amount) {
                self.report_error(error, format!("order {}", order.order_id));
            }
        }
    }

    /// Whether the opposite ladder can absorb the full order quantity
    fn can_fill_completely(&self, order: &Order, book: &OrderBook) -> bool {
        let depth = match order.side {
            Side::Buy => book.ask_depth(DEPTH_WALK_LIMIT),
            Side::Sell => book.bid_depth(DEPTH_WALK_LIMIT),
        };

        let mut available: u64 = 0;
        for (price, quantity) in depth {
            if order.order_type == OrderType::Limit
                && !crossing::taker_crosses(order.side, order.order_type, order.price, price)
            {
                break;
            }
            available += quantity.raw();
            if available >= order.quantity.raw() {
                return true;
            }
        }
        false
    }

    /// The match loop. Runs until the taker is filled or nothing crosses.
    fn match_incoming(
        &self,
        order: &mut Order,
        book: &mut OrderBook,
        funding: &mut Funding,
    ) -> Vec<Trade> {
        let mut trades = Vec::new();
        let maker_side = order.side.opposite();

        while !order.is_filled() {
            let maker = match maker_side {
                Side::Sell => book.best_ask_order(),
                Side::Buy => book.best_bid_order(),
            };
            let Some((maker_order_id, maker_user_id, maker_remaining, maker_price)) = maker else {
                break;
            };

            if !crossing::taker_crosses(order.side, order.order_type, order.price, maker_price) {
                break;
            }

            let quantity = order.remaining().min(maker_remaining);

            // A market buy may only spend what its reservation walk covered.
            if let Funding::Market { remaining } = funding {
                let cost = maker_price.notional(quantity).unwrap_or(i64::MAX);
                if cost > *remaining {
                    break;
                }
            }

            let buyer_lock_price = match (order.side, order.order_type) {
                (Side::Buy, OrderType::Limit) => order.price,
                (Side::Buy, OrderType::Market) => maker_price,
                (Side::Sell, _) => maker_price,
            };

            let executed_at = self.clock.now_ms();
            let trade = match self.executor.execute(
                order,
                maker_order_id,
                maker_user_id,
                maker_price,
                quantity,
                buyer_lock_price,
                executed_at,
            ) {
                Ok(trade) => trade,
                Err(err) => {
                    error!(
                        order_id = %order.order_id,
                        maker_order_id = %maker_order_id,
                        error = %err,
                        "fill settlement failed"
                    );
                    self.report_error(err, format!("order {}", order.order_id));
                    break;
                }
            };

            order.add_fill(quantity);
            if let Err(err) = self.registry.apply_fill(order.order_id, quantity) {
                self.report_error(err, format!("order {}", order.order_id));
            }
            let maker_order = match self.registry.apply_fill(maker_order_id, quantity) {
                Ok(updated) => Some(updated),
                Err(err) => {
                    self.report_error(err, format!("order {maker_order_id}"));
                    None
                }
            };

            let _ = book.fill_best(maker_side, quantity);
            if let Funding::Market { remaining } = funding {
                *remaining -= trade.notional().unwrap_or(0);
            }
            book.update_last_trade(maker_price, quantity);

            if let Some(maker_order) = maker_order {
                self.sink.emit(EngineEvent::OrderUpdated(maker_order));
            }
            self.sink.emit(EngineEvent::TradeExecuted {
                trade: trade.clone(),
                snapshot: book.snapshot(executed_at),
            });
            trades.push(trade);
        }

        trades
    }

    /// Apply the residual policy after the match loop.
    fn settle_residual(&self, order: &mut Order, book: &mut OrderBook, funding: &Funding) {
        match order.order_type {
            OrderType::Market => {
                // Market orders never rest; release any unused reservation.
                if let Funding::Market { remaining } = funding {
                    if *remaining > 0 {
                        if let Err(error) = self.ledger.unlock(order.user_id, *remaining) {
                            self.report_error(error, format!("order {}", order.order_id));
                        }
                    }
                }
                if !order.has_fills() {
                    *order = self.cancel_in_registry(order.clone());
                }
            }
            OrderType::Limit => match order.time_in_force {
                TimeInForce::Gfd => {
                    if !order.is_filled() && !order.status.is_terminal() {
                        book.add(order);
                    }
                }
                TimeInForce::Ioc => {
                    if !order.is_filled() {
                        if order.side == Side::Buy {
                            let residual = order.price.notional(order.remaining()).unwrap_or(0);
                            if residual > 0 {
                                if let Err(error) = self.ledger.unlock(order.user_id, residual) {
                                    self.report_error(error, format!("order {}", order.order_id));
                                }
                            }
                        }
                        if !order.has_fills() {
                            *order = self.cancel_in_registry(order.clone());
                        }
                    }
                }
                TimeInForce::Fok => {}
            },
        }
    }

    /// Mark an order cancelled in the registry, falling back to the local
    /// copy if the registry disagrees.
    fn cancel_in_registry(&self, mut order: Order) -> Order {
        match self.registry.set_status(order.order_id, OrderStatus::Cancelled) {
            Ok(updated) => updated,
            Err(err) => {
                self.report_error(err, format!("order {}", order.order_id));
                order.status = OrderStatus::Cancelled;
                order
            }
        }
    }
}

/// Cost of filling a market buy against the current ask ladder, capped at
/// the walk limit. This is the sentinel reservation locked before matching.
fn market_buy_reservation(order: &Order, book: &OrderBook) -> i64 {
    let mut need = order.quantity.raw();
    let mut cost: i64 = 0;
    for (price, quantity) in book.ask_depth(DEPTH_WALK_LIMIT) {
        if need == 0 {
            break;
        }
        let take = need.min(quantity.raw());
        let level_cost = price
            .notional(Quantity::from_raw(take))
            .unwrap_or(i64::MAX);
        cost = cost.saturating_add(level_cost);
        need -= take;
    }
    cost
}
