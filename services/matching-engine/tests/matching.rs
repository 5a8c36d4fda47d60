//! End-to-end matching scenarios
//!
//! Exercises the full submit/cancel surface: crossing, partial fills,
//! time-in-force policies, market orders, fund locking, and the event
//! stream. Prices are in cents, quantities in whole units.

use matching_engine::{EngineEvent, EventSink, MatchingEngine, NullSink, SubmitResult};
use std::sync::{Arc, Mutex};
use types::prelude::*;

/// Sink that records every event for ordering assertions
#[derive(Default)]
struct CollectSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl CollectSink {
    fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for CollectSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn engine() -> MatchingEngine {
    let engine = MatchingEngine::new(Arc::new(NullSink));
    engine.initialize_balance(UserId::from_u64(1), 1_000_000);
    engine.initialize_balance(UserId::from_u64(2), 1_000_000);
    engine
}

fn limit(
    engine: &MatchingEngine,
    user: u64,
    side: Side,
    tif: TimeInForce,
    price: i64,
    qty: u64,
) -> SubmitResult {
    engine.submit_order(
        UserId::from_u64(user),
        Symbol::new("X"),
        side,
        OrderType::Limit,
        tif,
        Price::from_raw(price),
        Quantity::from_raw(qty),
    )
}

fn market(engine: &MatchingEngine, user: u64, side: Side, qty: u64) -> SubmitResult {
    engine.submit_order(
        UserId::from_u64(user),
        Symbol::new("X"),
        side,
        OrderType::Market,
        TimeInForce::Ioc,
        Price::ZERO,
        Quantity::from_raw(qty),
    )
}

fn balance(engine: &MatchingEngine, user: u64) -> UserBalance {
    engine.balance(UserId::from_u64(user))
}

fn expect_filled(result: SubmitResult) -> (Order, Vec<Trade>) {
    match result {
        SubmitResult::Filled { order, trades } => (order, trades),
        other => panic!("expected full fill, got {other:?}"),
    }
}

fn expect_partial(result: SubmitResult) -> (Order, Vec<Trade>) {
    match result {
        SubmitResult::PartiallyFilled { order, trades } => (order, trades),
        other => panic!("expected partial fill, got {other:?}"),
    }
}

fn expect_cancelled(result: SubmitResult) -> Order {
    match result {
        SubmitResult::Cancelled { order } => order,
        other => panic!("expected cancellation, got {other:?}"),
    }
}

#[test]
fn simple_cross_executes_at_maker_price() {
    let engine = engine();

    let sell = limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_000, 5);
    assert!(matches!(sell, SubmitResult::Resting { .. }));

    let (order, trades) = expect_filled(limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 10_500, 5));

    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].price, Price::from_raw(10_000));
    assert_eq!(trades[0].quantity, Quantity::from_raw(5));
    assert_eq!(order.status, OrderStatus::Filled);
    assert_eq!(
        engine.order_status(sell.order().order_id).unwrap().status,
        OrderStatus::Filled
    );

    // Buyer locked 52_500 at its limit, paid 50_000, improvement refunded
    let buyer = balance(&engine, 1);
    assert_eq!(buyer.available, 950_000);
    assert_eq!(buyer.locked, 0);
    let seller = balance(&engine, 2);
    assert_eq!(seller.available, 1_050_000);

    let snapshot = engine.market_snapshot(&Symbol::new("X")).unwrap();
    assert_eq!(snapshot.bid_price, Price::ZERO);
    assert_eq!(snapshot.ask_price, Price::ZERO);
    assert_eq!(snapshot.last_trade_price, Price::from_raw(10_000));
    assert_eq!(snapshot.total_volume, 5);
}

#[test]
fn partial_fill_rests_residual() {
    let engine = engine();

    let buy = limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 10_000, 10);
    assert!(matches!(buy, SubmitResult::Resting { .. }));

    let (_, trades) = expect_filled(limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_000, 4));
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].price, Price::from_raw(10_000));
    assert_eq!(trades[0].quantity, Quantity::from_raw(4));

    let resting = engine.order_status(buy.order().order_id).unwrap();
    assert_eq!(resting.status, OrderStatus::PartiallyFilled);
    assert_eq!(resting.remaining(), Quantity::from_raw(6));

    let snapshot = engine.market_snapshot(&Symbol::new("X")).unwrap();
    assert_eq!(snapshot.bid_price, Price::from_raw(10_000));
    assert_eq!(snapshot.bid_quantity, Quantity::from_raw(6));

    let buyer = balance(&engine, 1);
    assert_eq!(buyer.locked, 60_000);
    assert_eq!(buyer.available, 940_000);
    assert_eq!(balance(&engine, 2).available, 1_040_000);
}

#[test]
fn ioc_releases_unfilled_reservation() {
    let engine = engine();

    limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_000, 3);

    let (order, trades) = expect_partial(limit(&engine, 1, Side::Buy, TimeInForce::Ioc, 10_000, 10));

    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].quantity, Quantity::from_raw(3));
    assert_eq!(order.status, OrderStatus::PartiallyFilled);

    // Residual does not rest and its reservation is gone
    let snapshot = engine.market_snapshot(&Symbol::new("X")).unwrap();
    assert_eq!(snapshot.bid_price, Price::ZERO);
    let buyer = balance(&engine, 1);
    assert_eq!(buyer.locked, 0);
    assert_eq!(buyer.available, 970_000);
}

#[test]
fn ioc_with_no_liquidity_cancels() {
    let engine = engine();

    let order = expect_cancelled(limit(&engine, 1, Side::Buy, TimeInForce::Ioc, 10_000, 10));

    assert_eq!(order.status, OrderStatus::Cancelled);
    assert!(!order.has_fills());
    assert_eq!(balance(&engine, 1).locked, 0);
    assert_eq!(balance(&engine, 1).available, 1_000_000);
}

#[test]
fn fok_kills_without_touching_the_book() {
    let engine = engine();

    let sell = limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_000, 3);

    let order = expect_cancelled(limit(&engine, 1, Side::Buy, TimeInForce::Fok, 10_000, 10));
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert!(!order.has_fills());

    // The resting sell is untouched and the buyer holds nothing
    let resting = engine.order_status(sell.order().order_id).unwrap();
    assert_eq!(resting.status, OrderStatus::Pending);
    let snapshot = engine.market_snapshot(&Symbol::new("X")).unwrap();
    assert_eq!(snapshot.ask_quantity, Quantity::from_raw(3));
    assert_eq!(balance(&engine, 1).locked, 0);
    assert_eq!(balance(&engine, 1).available, 1_000_000);
}

#[test]
fn fok_fills_completely_when_depth_suffices() {
    let engine = engine();

    limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_000, 6);
    limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_100, 6);

    let (_, trades) = expect_filled(limit(&engine, 1, Side::Buy, TimeInForce::Fok, 10_100, 10));

    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].price, Price::from_raw(10_000));
    assert_eq!(trades[0].quantity, Quantity::from_raw(6));
    assert_eq!(trades[1].price, Price::from_raw(10_100));
    assert_eq!(trades[1].quantity, Quantity::from_raw(4));
    assert_eq!(balance(&engine, 1).locked, 0);
}

#[test]
fn market_buy_consumes_multiple_levels() {
    let engine = engine();

    limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_000, 4);
    limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_100, 3);

    let (_, trades) = expect_filled(market(&engine, 1, Side::Buy, 6));

    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].price, Price::from_raw(10_000));
    assert_eq!(trades[0].quantity, Quantity::from_raw(4));
    assert_eq!(trades[1].price, Price::from_raw(10_100));
    assert_eq!(trades[1].quantity, Quantity::from_raw(2));

    let snapshot = engine.market_snapshot(&Symbol::new("X")).unwrap();
    assert_eq!(snapshot.ask_price, Price::from_raw(10_100));
    assert_eq!(snapshot.ask_quantity, Quantity::from_raw(1));

    let buyer = balance(&engine, 1);
    assert_eq!(buyer.available, 1_000_000 - 60_200);
    assert_eq!(buyer.locked, 0);
    assert_eq!(balance(&engine, 2).available, 1_060_200);
}

#[test]
fn market_buy_with_no_liquidity_cancels() {
    let engine = engine();

    let order = expect_cancelled(market(&engine, 1, Side::Buy, 5));
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(
        balance(&engine, 1),
        UserBalance::new(UserId::from_u64(1), 1_000_000)
    );
}

#[test]
fn market_buy_partial_when_liquidity_runs_out() {
    let engine = engine();

    limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_000, 4);

    let (order, trades) = expect_partial(market(&engine, 1, Side::Buy, 10));
    assert_eq!(trades.len(), 1);
    assert_eq!(order.filled_quantity, Quantity::from_raw(4));

    let buyer = balance(&engine, 1);
    assert_eq!(buyer.locked, 0);
    assert_eq!(buyer.available, 960_000);
}

#[test]
fn market_sell_executes_against_bids() {
    let engine = engine();

    limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 10_000, 5);

    let (_, trades) = expect_filled(market(&engine, 2, Side::Sell, 3));
    assert_eq!(trades[0].price, Price::from_raw(10_000));

    // Resting buyer keeps the reservation for its unfilled 2 units
    assert_eq!(balance(&engine, 1).locked, 20_000);
    assert_eq!(balance(&engine, 2).available, 1_030_000);
}

#[test]
fn cancel_releases_locked_funds_and_empties_book() {
    let engine = engine();

    let buy = limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 10_000, 5);
    assert_eq!(balance(&engine, 1).locked, 50_000);

    let cancelled = engine.cancel_order(buy.order().order_id).unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let buyer = balance(&engine, 1);
    assert_eq!(buyer.locked, 0);
    assert_eq!(buyer.available, 1_000_000);

    let snapshot = engine.market_snapshot(&Symbol::new("X")).unwrap();
    assert_eq!(snapshot.bid_price, Price::ZERO);
    assert_eq!(snapshot.bid_quantity, Quantity::ZERO);
}

#[test]
fn cancel_is_not_repeatable() {
    let engine = engine();

    let buy = limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 10_000, 5);
    let order_id = buy.order().order_id;

    engine.cancel_order(order_id).unwrap();
    assert_eq!(
        engine.order_status(order_id).unwrap().status,
        OrderStatus::Cancelled
    );

    let err = engine.cancel_order(order_id).unwrap_err();
    assert_eq!(err.code(), "SYSTEM_ERROR");
    // Locked funds unchanged by the failed second cancel
    assert_eq!(balance(&engine, 1).locked, 0);
}

#[test]
fn cancel_unknown_order() {
    let engine = engine();
    let err = engine.cancel_order(OrderId::from_u64(404)).unwrap_err();
    assert_eq!(err, EngineError::OrderNotFound(OrderId::from_u64(404)));
}

#[test]
fn cancel_filled_order_fails() {
    let engine = engine();

    limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_000, 5);
    let buy = limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 10_000, 5);
    assert!(matches!(buy, SubmitResult::Filled { .. }));

    let err = engine.cancel_order(buy.order().order_id).unwrap_err();
    assert_eq!(err.code(), "SYSTEM_ERROR");
}

#[test]
fn insufficient_balance_rejects_buy() {
    let engine = MatchingEngine::new(Arc::new(NullSink));
    engine.initialize_balance(UserId::from_u64(1), 100);

    let result = limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 10_000, 5);
    let (order, error) = match result {
        SubmitResult::Rejected { order, error } => (order, error),
        other => panic!("expected rejection, got {other:?}"),
    };
    assert_eq!(order.status, OrderStatus::Rejected);
    assert_eq!(error.code(), "INSUFFICIENT_BALANCE");
    // Rejected orders are not indexed
    assert!(engine.order_status(order.order_id).is_none());
}

#[test]
fn validation_rejects_bad_orders() {
    let engine = engine();

    let result = engine.submit_order(
        UserId::from_u64(1),
        Symbol::new(""),
        Side::Buy,
        OrderType::Limit,
        TimeInForce::Gfd,
        Price::from_raw(100),
        Quantity::from_raw(1),
    );
    assert!(matches!(
        result,
        SubmitResult::Rejected {
            error: EngineError::InvalidSymbol,
            ..
        }
    ));

    let result = limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 0, 1);
    assert!(matches!(
        result,
        SubmitResult::Rejected {
            error: EngineError::InvalidPrice(0),
            ..
        }
    ));

    let result = limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 100, 0);
    assert!(matches!(
        result,
        SubmitResult::Rejected {
            error: EngineError::InvalidQuantity,
            ..
        }
    ));
}

#[test]
fn self_trades_are_permitted() {
    let engine = engine();

    limit(&engine, 1, Side::Sell, TimeInForce::Gfd, 10_000, 5);
    let (_, trades) = expect_filled(limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 10_000, 5));
    assert_eq!(trades[0].buy_user_id, trades[0].sell_user_id);

    // Value nets out for the self-trading user
    let user = balance(&engine, 1);
    assert_eq!(user.available, 1_000_000);
    assert_eq!(user.locked, 0);
}

#[test]
fn price_time_priority_within_level() {
    let engine = engine();

    let first = limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_000, 2);
    let second = limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_000, 2);

    let (_, trades) = expect_filled(limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 10_000, 2));

    assert_eq!(trades[0].sell_order_id, first.order().order_id);
    assert_eq!(
        engine.order_status(second.order().order_id).unwrap().status,
        OrderStatus::Pending
    );
}

#[test]
fn better_priced_level_matches_first() {
    let engine = engine();

    limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_100, 5);
    let cheap = limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_000, 5);

    let (_, trades) = expect_filled(limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 10_200, 5));
    assert_eq!(trades[0].sell_order_id, cheap.order().order_id);
    assert_eq!(trades[0].price, Price::from_raw(10_000));
}

#[test]
fn ids_are_globally_monotonic() {
    let engine = engine();

    // Order ids increase across symbols
    let a = limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_000, 1);
    let b = engine.submit_order(
        UserId::from_u64(1),
        Symbol::new("Y"),
        Side::Sell,
        OrderType::Limit,
        TimeInForce::Gfd,
        Price::from_raw(10_000),
        Quantity::from_raw(1),
    );
    assert!(b.order().order_id > a.order().order_id);

    // Trade ids increase across symbols too
    let first = limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 10_000, 1);
    let second = engine.submit_order(
        UserId::from_u64(2),
        Symbol::new("Y"),
        Side::Buy,
        OrderType::Limit,
        TimeInForce::Gfd,
        Price::from_raw(10_000),
        Quantity::from_raw(1),
    );
    assert_eq!(first.trades().len(), 1);
    assert_eq!(second.trades().len(), 1);
    assert!(second.trades()[0].trade_id > first.trades()[0].trade_id);
}

#[test]
fn locked_equals_live_buy_reservations() {
    let engine = engine();

    limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 10_000, 5);
    limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 9_900, 3);
    limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_000, 2);

    let expected: i64 = engine
        .user_orders(UserId::from_u64(1))
        .iter()
        .filter(|order| {
            order.side == Side::Buy
                && order.order_type == OrderType::Limit
                && !order.status.is_terminal()
        })
        .map(|order| order.price.notional(order.remaining()).unwrap())
        .sum();

    assert_eq!(balance(&engine, 1).locked, expected);
    assert_eq!(expected, 10_000 * 3 + 9_900 * 3);
}

#[test]
fn value_is_conserved_across_fills() {
    let engine = engine();

    limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 10_000, 10);
    limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 9_900, 4);
    limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_000, 6);
    market(&engine, 1, Side::Buy, 3);
    limit(&engine, 2, Side::Sell, TimeInForce::Ioc, 9_000, 20);

    let total: i64 = engine
        .balances()
        .iter()
        .map(|balance| balance.total())
        .sum();
    assert_eq!(total, 2_000_000);
}

#[test]
fn book_is_never_crossed_at_rest() {
    let engine = engine();

    limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 10_000, 5);
    limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_200, 5);
    limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 10_100, 2);
    limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 9_950, 3);

    let snapshot = engine.market_snapshot(&Symbol::new("X")).unwrap();
    if snapshot.bid_price.is_positive() && snapshot.ask_price.is_positive() {
        assert!(snapshot.bid_price < snapshot.ask_price);
    }
}

#[test]
fn trade_price_within_both_limits() {
    let engine = engine();

    limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 9_900, 5);
    let buy = limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 10_500, 5);

    for trade in buy.trades() {
        let buy_order = engine.order_status(trade.buy_order_id).unwrap();
        let sell_order = engine.order_status(trade.sell_order_id).unwrap();
        assert!(buy_order.price >= trade.price);
        assert!(sell_order.price <= trade.price);
    }
}

#[test]
fn events_follow_fill_order() {
    let sink = Arc::new(CollectSink::default());
    let engine = MatchingEngine::new(Arc::clone(&sink) as Arc<dyn EventSink>);
    engine.initialize_balance(UserId::from_u64(1), 1_000_000);
    engine.initialize_balance(UserId::from_u64(2), 1_000_000);

    limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_000, 2);
    limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_100, 2);
    let buy = limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 10_100, 4);
    let taker_id = buy.order().order_id;

    let events = sink.events();

    // Skip the two resting-order updates, then expect per fill:
    // maker update, trade; finally the taker's own update.
    let tail = &events[2..];
    let mut trade_prices = Vec::new();
    let mut saw_taker_update = false;
    for event in tail {
        match event {
            EngineEvent::TradeExecuted { trade, snapshot } => {
                trade_prices.push(trade.price.raw());
                assert_eq!(snapshot.last_trade_price, trade.price);
            }
            EngineEvent::OrderUpdated(order) if order.order_id == taker_id => {
                saw_taker_update = true;
                assert_eq!(trade_prices.len(), 2, "taker update must come last");
            }
            _ => {}
        }
    }
    assert_eq!(trade_prices, vec![10_000, 10_100]);
    assert!(saw_taker_update);
}

#[test]
fn rejections_are_published_as_errors() {
    let sink = Arc::new(CollectSink::default());
    let engine = MatchingEngine::new(Arc::clone(&sink) as Arc<dyn EventSink>);

    let result = limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 10_000, 5);
    assert!(matches!(result, SubmitResult::Rejected { .. }));

    let events = sink.events();
    assert!(events.iter().any(|event| matches!(
        event,
        EngineEvent::Error {
            error: EngineError::InsufficientBalance { .. },
            ..
        }
    )));
}

#[test]
fn books_are_independent_per_symbol() {
    let engine = engine();

    limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_000, 5);
    engine.submit_order(
        UserId::from_u64(1),
        Symbol::new("Y"),
        Side::Buy,
        OrderType::Limit,
        TimeInForce::Gfd,
        Price::from_raw(10_500),
        Quantity::from_raw(5),
    );

    // The buy on Y must not cross the sell on X
    let x = engine.market_snapshot(&Symbol::new("X")).unwrap();
    assert_eq!(x.ask_quantity, Quantity::from_raw(5));
    let y = engine.market_snapshot(&Symbol::new("Y")).unwrap();
    assert_eq!(y.bid_quantity, Quantity::from_raw(5));

    let mut symbols = engine.symbols();
    symbols.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    assert_eq!(symbols, vec![Symbol::new("X"), Symbol::new("Y")]);
}

#[test]
fn active_orders_by_symbol() {
    let engine = engine();

    limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 10_000, 5);
    let cancelled = limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 9_900, 5);
    engine.cancel_order(cancelled.order().order_id).unwrap();

    let active = engine.active_orders(&Symbol::new("X"));
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].price, Price::from_raw(10_000));
}

#[test]
fn depth_reports_aggregated_levels() {
    let engine = engine();

    limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_000, 4);
    limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_000, 1);
    limit(&engine, 2, Side::Sell, TimeInForce::Gfd, 10_100, 3);
    limit(&engine, 1, Side::Buy, TimeInForce::Gfd, 9_900, 2);

    let (bids, asks) = engine.depth(&Symbol::new("X"), 10).unwrap();
    assert_eq!(bids, vec![(Price::from_raw(9_900), Quantity::from_raw(2))]);
    assert_eq!(
        asks,
        vec![
            (Price::from_raw(10_000), Quantity::from_raw(5)),
            (Price::from_raw(10_100), Quantity::from_raw(3)),
        ]
    );
}
