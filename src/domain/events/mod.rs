//! Domain events
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::PaymentStatus;

/// Raised after a payment status transition has been persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatusChanged {
    pub event_id: Uuid,
    pub order_id: i64,
    pub old_status: PaymentStatus,
    pub new_status: PaymentStatus,
    pub transaction_no: Option<String>,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl PaymentStatusChanged {
    pub fn new(
        order_id: i64,
        old_status: PaymentStatus,
        new_status: PaymentStatus,
        transaction_no: Option<String>,
        note: Option<String>,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            order_id,
            old_status,
            new_status,
            transaction_no,
            note,
            occurred_at: Utc::now(),
        }
    }
}
