use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::OrderRepository;
use crate::domain::aggregates::{NewOrder, Order, PaymentStatus, PaymentUpdate};
use crate::Result;

#[derive(Default)]
struct Inner {
    next_id: i64,
    orders: HashMap<i64, Order>,
}

/// A thread-safe in-memory order store.
///
/// The compare-and-set runs under a single write guard, so concurrent callbacks
/// for one order serialize on it. Used when no database is configured and in tests.
#[derive(Default, Clone)]
pub struct InMemoryOrderRepository {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `order` as-is, replacing any order with the same id.
    pub async fn insert(&self, order: Order) {
        let mut inner = self.inner.write().await;
        inner.next_id = inner.next_id.max(order.id);
        inner.orders.insert(order.id, order);
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Order>> {
        let inner = self.inner.read().await;
        Ok(inner.orders.get(&id).cloned())
    }

    async fn create(&self, order: NewOrder) -> Result<Order> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let order = Order::place(inner.next_id, order);
        inner.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn compare_and_set_payment_status(
        &self,
        id: i64,
        expected: PaymentStatus,
        update: PaymentUpdate,
    ) -> Result<Option<Order>> {
        let mut inner = self.inner.write().await;
        match inner.orders.get_mut(&id) {
            Some(order) if order.payment_status == expected => {
                order.apply(&update);
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }
}
