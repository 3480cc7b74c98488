use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::OrderRepository;
use crate::domain::aggregates::{NewOrder, Order, PaymentStatus, PaymentUpdate};
use crate::{PaymentError, Result};

#[derive(Debug, Clone, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    customer_email: String,
    total_amount: Decimal,
    order_status: String,
    payment_method: String,
    payment_status: String,
    transaction_no: Option<String>,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = PaymentError;

    fn try_from(r: OrderRow) -> Result<Self> {
        Ok(Order {
            id: r.id,
            customer_email: r.customer_email,
            total_amount: r.total_amount,
            status: r.order_status.parse()?,
            payment_method: r.payment_method.parse()?,
            payment_status: r.payment_status.parse()?,
            transaction_no: r.transaction_no,
            note: r.note,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Orders table in PostgreSQL. Payment-status writes are a single conditional `UPDATE`.
#[derive(Clone)]
pub struct PgOrderRepository {
    db: PgPool,
}

impl PgOrderRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn create(&self, order: NewOrder) -> Result<Order> {
        sqlx::query_as::<_, OrderRow>(
            "INSERT INTO orders (customer_email, total_amount, order_status, payment_method, \
             payment_status, created_at, updated_at) \
             VALUES ($1, $2, 'PENDING', $3, 'PENDING', NOW(), NOW()) RETURNING *",
        )
        .bind(&order.customer_email)
        .bind(order.total_amount)
        .bind(order.payment_method.as_str())
        .fetch_one(&self.db)
        .await?
        .try_into()
    }

    async fn compare_and_set_payment_status(
        &self,
        id: i64,
        expected: PaymentStatus,
        update: PaymentUpdate,
    ) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>(
            "UPDATE orders SET payment_status = $3, note = $4, \
             transaction_no = COALESCE($5, transaction_no), updated_at = NOW() \
             WHERE id = $1 AND payment_status = $2 RETURNING *",
        )
        .bind(id)
        .bind(expected.as_str())
        .bind(update.status.as_str())
        .bind(&update.note)
        .bind(update.transaction_no.as_deref())
        .fetch_optional(&self.db)
        .await?
        .map(Order::try_from)
        .transpose()
    }
}
