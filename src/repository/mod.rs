//! Order persistence port and its adapters.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::aggregates::{NewOrder, Order, PaymentStatus, PaymentUpdate};
use crate::Result;

pub mod in_memory;
pub mod postgres;

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Order>>;

    async fn create(&self, order: NewOrder) -> Result<Order>;

    /// Applies `update` only if the stored payment status is still `expected`.
    ///
    /// Returns the updated order, or `None` when the order is missing or another
    /// writer already moved it out of `expected`.
    async fn compare_and_set_payment_status(
        &self,
        id: i64,
        expected: PaymentStatus,
        update: PaymentUpdate,
    ) -> Result<Option<Order>>;
}

pub type OrderRepositoryRef = Arc<dyn OrderRepository>;
