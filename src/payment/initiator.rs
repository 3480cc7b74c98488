//! Starts a gateway payment for an existing order.

use chrono::Utc;
use tracing::{info, instrument};

use super::builder::{PaymentRequest, PaymentUrlBuilder};
use crate::domain::aggregates::{PaymentStatus, PaymentUpdate};
use crate::domain::events::PaymentStatusChanged;
use crate::notify::NotificationDispatcher;
use crate::repository::OrderRepositoryRef;
use crate::{PaymentError, Result};

#[derive(Clone)]
pub struct PaymentInitiator {
    builder: PaymentUrlBuilder,
    orders: OrderRepositoryRef,
    notifications: NotificationDispatcher,
}

impl PaymentInitiator {
    pub fn new(
        builder: PaymentUrlBuilder,
        orders: OrderRepositoryRef,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self {
            builder,
            orders,
            notifications,
        }
    }

    /// Returns the gateway URL for `order_id`.
    ///
    /// A `FAILED` order is put back to `PENDING` once the URL is built, so the
    /// callback of the new attempt can settle it.
    #[instrument(skip(self))]
    pub async fn initiate(&self, order_id: i64, client_ip: &str) -> Result<String> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(PaymentError::OrderNotFound)?;
        order.ensure_payable()?;

        let id = order.id.to_string();
        let url = self.builder.build(&PaymentRequest {
            order_id: &id,
            amount: order.total_amount,
            client_ip,
            created_at: Utc::now(),
        })?;

        if order.payment_status == PaymentStatus::Failed {
            let update = PaymentUpdate {
                status: PaymentStatus::Pending,
                note: "Payment retried via VNPay".to_string(),
                transaction_no: None,
            };
            let rearmed = self
                .orders
                .compare_and_set_payment_status(order.id, PaymentStatus::Failed, update.clone())
                .await?;
            if rearmed.is_some() {
                self.notifications.dispatch(PaymentStatusChanged::new(
                    order.id,
                    PaymentStatus::Failed,
                    PaymentStatus::Pending,
                    None,
                    Some(update.note),
                ));
            }
        }

        info!(order_id, "payment url issued");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_merchant;
    use crate::domain::aggregates::{NewOrder, Order, PaymentMethod};
    use crate::notify::RecordingNotifier;
    use crate::repository::in_memory::InMemoryOrderRepository;
    use crate::repository::OrderRepository;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::time::Duration;

    async fn setup(
        total: Decimal,
        status: PaymentStatus,
    ) -> (PaymentInitiator, InMemoryOrderRepository, RecordingNotifier) {
        let repo = InMemoryOrderRepository::new();
        let mut order = Order::place(
            1024,
            NewOrder {
                customer_email: "a@example.com".into(),
                total_amount: total,
                payment_method: PaymentMethod::Vnpay,
            },
        );
        order.payment_status = status;
        repo.insert(order).await;

        let recorder = RecordingNotifier::new();
        let initiator = PaymentInitiator::new(
            PaymentUrlBuilder::new(Arc::new(test_merchant())),
            Arc::new(repo.clone()),
            NotificationDispatcher::new(Arc::new(recorder.clone()), Duration::from_secs(1)),
        );
        (initiator, repo, recorder)
    }

    #[tokio::test]
    async fn test_initiate_pending_order() {
        let (initiator, repo, _) = setup(dec!(150000.00), PaymentStatus::Pending).await;
        let url = initiator.initiate(1024, "127.0.0.1").await.unwrap();
        assert!(url.contains("vnp_Amount=15000000"));
        assert!(url.contains("vnp_TxnRef=1024"));
        assert!(url.contains("vnp_SecureHash="));
        let order = repo.find_by_id(1024).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_paid_order_is_rejected() {
        let (initiator, _, _) = setup(dec!(150000.00), PaymentStatus::Paid).await;
        assert!(matches!(
            initiator.initiate(1024, "127.0.0.1").await,
            Err(PaymentError::AlreadyPaid)
        ));
    }

    #[tokio::test]
    async fn test_zero_total_is_rejected() {
        let (initiator, _, _) = setup(dec!(0), PaymentStatus::Pending).await;
        assert!(matches!(
            initiator.initiate(1024, "127.0.0.1").await,
            Err(PaymentError::InvalidAmount)
        ));
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let (initiator, _, _) = setup(dec!(1), PaymentStatus::Pending).await;
        assert!(matches!(
            initiator.initiate(1, "127.0.0.1").await,
            Err(PaymentError::OrderNotFound)
        ));
    }

    #[tokio::test]
    async fn test_failed_order_is_rearmed() {
        let (initiator, repo, recorder) = setup(dec!(99000), PaymentStatus::Failed).await;
        initiator.initiate(1024, "127.0.0.1").await.unwrap();
        let order = repo.find_by_id(1024).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Pending);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let events = recorder.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].old_status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn test_invalid_amount_leaves_failed_order_untouched() {
        let (initiator, repo, _) = setup(dec!(1.005), PaymentStatus::Failed).await;
        assert!(matches!(
            initiator.initiate(1024, "127.0.0.1").await,
            Err(PaymentError::InvalidAmount)
        ));
        let order = repo.find_by_id(1024).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Failed);
    }
}
