//! Order registry
//!
//! Canonical store of every accepted order. Status and filled-quantity
//! mutations go through here; books only hold references by id. Terminal
//! orders stay queryable after leaving the books.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use types::prelude::*;

/// A rejected order together with the validation error.
///
/// The order is returned to the caller for reporting but is never indexed.
#[derive(Debug, Clone)]
pub struct Rejected {
    pub order: Order,
    pub error: EngineError,
}

#[derive(Debug, Default)]
struct RegistryInner {
    orders: HashMap<OrderId, Order>,
    by_user: HashMap<UserId, Vec<OrderId>>,
}

#[derive(Debug)]
pub struct OrderRegistry {
    ids: Arc<IdAllocator>,
    inner: Mutex<RegistryInner>,
}

impl OrderRegistry {
    pub fn new(ids: Arc<IdAllocator>) -> Self {
        Self {
            ids,
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// Allocate an id and validate a new order.
    ///
    /// On validation failure the order comes back with status `Rejected`
    /// and is not indexed. Indexing happens separately via [`insert`]
    /// once funds are locked.
    ///
    /// [`insert`]: OrderRegistry::insert
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &self,
        user_id: UserId,
        symbol: Symbol,
        side: Side,
        order_type: OrderType,
        time_in_force: TimeInForce,
        price: Price,
        quantity: Quantity,
        created_at: i64,
    ) -> Result<Order, Rejected> {
        let mut order = Order::new(
            self.ids.next_order_id(),
            user_id,
            symbol,
            side,
            order_type,
            time_in_force,
            price,
            quantity,
            created_at,
        );

        if let Err(error) = validate(&order) {
            order.status = OrderStatus::Rejected;
            return Err(Rejected { order, error });
        }

        Ok(order)
    }

    /// Index a validated, funded order.
    pub fn insert(&self, order: &Order) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        if inner.orders.contains_key(&order.order_id) {
            return Err(EngineError::DuplicateOrder(order.order_id));
        }
        inner.orders.insert(order.order_id, order.clone());
        inner
            .by_user
            .entry(order.user_id)
            .or_default()
            .push(order.order_id);
        Ok(())
    }

    /// Record a fill against a stored order, returning the updated order.
    pub fn apply_fill(&self, order_id: OrderId, quantity: Quantity) -> Result<Order, EngineError> {
        let mut inner = self.inner.lock();
        let order = inner
            .orders
            .get_mut(&order_id)
            .ok_or(EngineError::OrderNotFound(order_id))?;

        if order.remaining() < quantity {
            return Err(EngineError::System(format!(
                "fill of {quantity} exceeds remaining {} on order {order_id}",
                order.remaining()
            )));
        }

        order.add_fill(quantity);
        Ok(order.clone())
    }

    /// Overwrite the status of a stored order, returning the updated order.
    ///
    /// Used for the terminal transitions the match loop decides (IOC/FOK
    /// and market-order cancellation).
    pub fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order, EngineError> {
        let mut inner = self.inner.lock();
        let order = inner
            .orders
            .get_mut(&order_id)
            .ok_or(EngineError::OrderNotFound(order_id))?;
        order.status = status;
        Ok(order.clone())
    }

    /// Transition an order to `Cancelled`.
    ///
    /// Only registry state changes here; removing the order from its book
    /// and releasing funds are the caller's responsibility.
    pub fn cancel(&self, order_id: OrderId) -> Result<Order, EngineError> {
        let mut inner = self.inner.lock();
        let order = inner
            .orders
            .get_mut(&order_id)
            .ok_or(EngineError::OrderNotFound(order_id))?;

        if order.status.is_terminal() {
            return Err(EngineError::System(format!(
                "order {order_id} is already terminal"
            )));
        }

        order.status = OrderStatus::Cancelled;
        Ok(order.clone())
    }

    pub fn get(&self, order_id: OrderId) -> Option<Order> {
        let inner = self.inner.lock();
        inner.orders.get(&order_id).cloned()
    }

    /// All orders ever accepted for a user, in submission order
    pub fn user_orders(&self, user_id: UserId) -> Vec<Order> {
        let inner = self.inner.lock();
        inner
            .by_user
            .get(&user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.orders.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Orders for a symbol that are still pending or partially filled
    pub fn active_by_symbol(&self, symbol: &Symbol) -> Vec<Order> {
        let inner = self.inner.lock();
        inner
            .orders
            .values()
            .filter(|order| {
                order.symbol == *symbol
                    && matches!(
                        order.status,
                        OrderStatus::Pending | OrderStatus::PartiallyFilled
                    )
            })
            .cloned()
            .collect()
    }
}

fn validate(order: &Order) -> Result<(), EngineError> {
    if order.symbol.is_empty() {
        return Err(EngineError::InvalidSymbol);
    }
    if order.quantity.is_zero() {
        return Err(EngineError::InvalidQuantity);
    }
    if order.order_type == OrderType::Limit {
        if !order.price.is_positive() {
            return Err(EngineError::InvalidPrice(order.price.raw()));
        }
        if order.price.notional(order.quantity).is_none() {
            return Err(EngineError::InvalidPrice(order.price.raw()));
        }
    }
    Ok(())
}
