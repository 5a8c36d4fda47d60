//! Trade execution
//!
//! Builds trade records and settles funds for one fill. The executor owns
//! nothing but references: trade ids come from the shared allocator, money
//! moves through the ledger.

use std::sync::Arc;
use types::prelude::*;

use crate::ledger::BalanceLedger;

#[derive(Debug)]
pub struct TradeExecutor {
    ids: Arc<IdAllocator>,
    ledger: Arc<BalanceLedger>,
}

impl TradeExecutor {
    pub fn new(ids: Arc<IdAllocator>, ledger: Arc<BalanceLedger>) -> Self {
        Self { ids, ledger }
    }

    /// Execute one fill between the incoming taker and a resting maker.
    ///
    /// `price` is the maker's price. `buyer_lock_price` is the per-unit
    /// reservation the buyer holds for these units: the buyer's limit price
    /// for limit buys, the execution price for market buys (reserved
    /// against walked depth). Settlement is atomic in the ledger.
    #[allow(clippy::too_many_arguments)]
    pub fn execute(
        &self,
        taker: &Order,
        maker_order_id: OrderId,
        maker_user_id: UserId,
        price: Price,
        quantity: Quantity,
        buyer_lock_price: Price,
        executed_at: i64,
    ) -> Result<Trade, EngineError> {
        let cost = price
            .notional(quantity)
            .ok_or_else(|| EngineError::System("trade value overflows".into()))?;
        let locked_portion = buyer_lock_price
            .notional(quantity)
            .ok_or_else(|| EngineError::System("reservation value overflows".into()))?;

        let (buy_order_id, sell_order_id, buy_user_id, sell_user_id) = match taker.side {
            Side::Buy => (taker.order_id, maker_order_id, taker.user_id, maker_user_id),
            Side::Sell => (maker_order_id, taker.order_id, maker_user_id, taker.user_id),
        };

        self.ledger
            .settle_fill(buy_user_id, locked_portion, cost, sell_user_id)?;

        Ok(Trade::new(
            self.ids.next_trade_id(),
            buy_order_id,
            sell_order_id,
            buy_user_id,
            sell_user_id,
            taker.symbol.clone(),
            price,
            quantity,
            executed_at,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taker(side: Side, price: i64, qty: u64) -> Order {
        Order::new(
            OrderId::from_u64(100),
            UserId::from_u64(1),
            Symbol::new("X"),
            side,
            OrderType::Limit,
            TimeInForce::Gfd,
            Price::from_raw(price),
            Quantity::from_raw(qty),
            1,
        )
    }

    #[test]
    fn test_buy_taker_orientation() {
        let ids = Arc::new(IdAllocator::new());
        let ledger = Arc::new(BalanceLedger::new());
        ledger.initialize(UserId::from_u64(1), 1_000_000);
        ledger.initialize(UserId::from_u64(2), 0);
        ledger.lock(UserId::from_u64(1), 52_500).unwrap();

        let executor = TradeExecutor::new(ids, ledger.clone());
        let order = taker(Side::Buy, 10_500, 5);
        let trade = executor
            .execute(
                &order,
                OrderId::from_u64(7),
                UserId::from_u64(2),
                Price::from_raw(10_000),
                Quantity::from_raw(5),
                Price::from_raw(10_500),
                99,
            )
            .unwrap();

        assert_eq!(trade.buy_order_id, OrderId::from_u64(100));
        assert_eq!(trade.sell_order_id, OrderId::from_u64(7));
        assert_eq!(trade.price, Price::from_raw(10_000));
        // Maker price executed, improvement refunded
        assert_eq!(ledger.balance(UserId::from_u64(1)).available, 950_000);
        assert_eq!(ledger.balance(UserId::from_u64(2)).available, 50_000);
    }

    #[test]
    fn test_sell_taker_orientation() {
        let ids = Arc::new(IdAllocator::new());
        let ledger = Arc::new(BalanceLedger::new());
        ledger.initialize(UserId::from_u64(1), 0);
        ledger.initialize(UserId::from_u64(2), 100_000);
        // Resting buyer (maker) holds the reservation at its own limit
        ledger.lock(UserId::from_u64(2), 50_000).unwrap();

        let executor = TradeExecutor::new(ids, ledger.clone());
        let order = taker(Side::Sell, 9_000, 5);
        let trade = executor
            .execute(
                &order,
                OrderId::from_u64(8),
                UserId::from_u64(2),
                Price::from_raw(10_000),
                Quantity::from_raw(5),
                Price::from_raw(10_000),
                99,
            )
            .unwrap();

        assert_eq!(trade.buy_order_id, OrderId::from_u64(8));
        assert_eq!(trade.sell_order_id, OrderId::from_u64(100));
        assert_eq!(trade.buy_user_id, UserId::from_u64(2));
        assert_eq!(ledger.balance(UserId::from_u64(1)).available, 50_000);
        assert_eq!(ledger.balance(UserId::from_u64(2)).locked, 0);
    }

    #[test]
    fn test_trade_ids_monotonic() {
        let ids = Arc::new(IdAllocator::new());
        let ledger = Arc::new(BalanceLedger::new());
        ledger.initialize(UserId::from_u64(1), 1_000_000);
        ledger.lock(UserId::from_u64(1), 20_000).unwrap();

        let executor = TradeExecutor::new(ids, ledger);
        let order = taker(Side::Buy, 10_000, 2);
        let first = executor
            .execute(
                &order,
                OrderId::from_u64(7),
                UserId::from_u64(2),
                Price::from_raw(10_000),
                Quantity::from_raw(1),
                Price::from_raw(10_000),
                1,
            )
            .unwrap();
        let second = executor
            .execute(
                &order,
                OrderId::from_u64(7),
                UserId::from_u64(2),
                Price::from_raw(10_000),
                Quantity::from_raw(1),
                Price::from_raw(10_000),
                2,
            )
            .unwrap();

        assert!(second.trade_id > first.trade_id);
    }
}
