//! Applies gateway return callbacks to order payment status.
//!
//! `PENDING -> PAID` for an approved callback, `PENDING -> FAILED` for anything
//! else. `PAID` and `FAILED` are never left from here. The write is a
//! storage-level compare-and-set, so duplicate or racing callbacks transition an
//! order at most once, and notification happens only for the write that won.
//! A callback whose signature cannot be recomputed aborts before any write.

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use super::callback::{CallbackParams, CallbackValidator, CallbackVerdict};
use crate::domain::aggregates::{PaymentStatus, PaymentUpdate};
use crate::domain::events::PaymentStatusChanged;
use crate::notify::NotificationDispatcher;
use crate::repository::OrderRepositoryRef;
use crate::{PaymentError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Paid { order_id: i64 },
    Failed { order_id: i64, reason: String },
    /// The order had already left `PENDING`; nothing was written.
    Unchanged { order_id: i64, status: PaymentStatus },
}

impl ReconcileOutcome {
    pub fn order_id(&self) -> i64 {
        match self {
            Self::Paid { order_id }
            | Self::Failed { order_id, .. }
            | Self::Unchanged { order_id, .. } => *order_id,
        }
    }
}

#[derive(Clone)]
pub struct PaymentReconciler {
    validator: CallbackValidator,
    orders: OrderRepositoryRef,
    notifications: NotificationDispatcher,
}

impl PaymentReconciler {
    pub fn new(
        validator: CallbackValidator,
        orders: OrderRepositoryRef,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self {
            validator,
            orders,
            notifications,
        }
    }

    pub async fn reconcile(&self, params: &CallbackParams) -> Result<ReconcileOutcome> {
        self.reconcile_at(params, Utc::now()).await
    }

    #[instrument(skip_all, fields(txn_ref = ?params.txn_ref().ok()))]
    pub async fn reconcile_at(
        &self,
        params: &CallbackParams,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome> {
        let order_id = params.txn_ref()?.order_id()?;
        let verdict = self.validator.verify(params)?;
        if verdict.is_authentic() {
            self.validator.check_freshness(params, now)?;
        }

        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(PaymentError::OrderNotFound)?;
        if order.payment_status != PaymentStatus::Pending {
            info!(order_id, status = %order.payment_status, "callback for settled order ignored");
            return Ok(ReconcileOutcome::Unchanged {
                order_id,
                status: order.payment_status,
            });
        }

        let update = payment_update(&verdict, params);
        let Some(updated) = self
            .orders
            .compare_and_set_payment_status(order_id, PaymentStatus::Pending, update.clone())
            .await?
        else {
            let status = self
                .orders
                .find_by_id(order_id)
                .await?
                .map(|o| o.payment_status)
                .ok_or(PaymentError::OrderNotFound)?;
            info!(order_id, %status, "concurrent callback already settled order");
            return Ok(ReconcileOutcome::Unchanged { order_id, status });
        };

        self.notifications.dispatch(PaymentStatusChanged::new(
            order_id,
            PaymentStatus::Pending,
            updated.payment_status,
            update.transaction_no,
            Some(update.note.clone()),
        ));

        if verdict.is_approved() {
            info!(order_id, "payment completed");
            Ok(ReconcileOutcome::Paid { order_id })
        } else {
            warn!(order_id, ?verdict, "payment failed");
            Ok(ReconcileOutcome::Failed {
                order_id,
                reason: update.note,
            })
        }
    }
}

fn payment_update(verdict: &CallbackVerdict, params: &CallbackParams) -> PaymentUpdate {
    let transaction_no = params.transaction_no().unwrap_or("-");
    match verdict {
        CallbackVerdict::Approved => PaymentUpdate {
            status: PaymentStatus::Paid,
            note: format!("Payment completed via VNPay - Transaction: {transaction_no}"),
            transaction_no: params.transaction_no().map(str::to_string),
        },
        CallbackVerdict::Declined {
            response_code,
            transaction_status,
        } => PaymentUpdate {
            status: PaymentStatus::Failed,
            note: format!(
                "Payment failed via VNPay - Response code: {}, Transaction status: {}, \
                 Transaction: {transaction_no}",
                response_code.as_deref().unwrap_or("-"),
                transaction_status.as_deref().unwrap_or("-"),
            ),
            transaction_no: params.transaction_no().map(str::to_string),
        },
        // Unauthenticated data is not recorded.
        CallbackVerdict::Empty
        | CallbackVerdict::MissingSignature
        | CallbackVerdict::SignatureMismatch => PaymentUpdate {
            status: PaymentStatus::Failed,
            note: "Payment rejected: invalid VNPay signature".to_string(),
            transaction_no: None,
        },
    }
}
