//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::value_objects::Money;
use crate::PaymentError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub customer_email: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub transaction_no: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipping,
    Delivered,
    Cancelled,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Cod,
    Vnpay,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

/// A payment-status write, applied only while the order is still in the expected state.
#[derive(Clone, Debug, PartialEq)]
pub struct PaymentUpdate {
    pub status: PaymentStatus,
    pub note: String,
    pub transaction_no: Option<String>,
}

/// Fields accepted when placing a new order.
#[derive(Clone, Debug)]
pub struct NewOrder {
    pub customer_email: String,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
}

impl Order {
    pub fn place(id: i64, new: NewOrder) -> Self {
        let now = Utc::now();
        Self {
            id,
            customer_email: new.customer_email,
            total_amount: new.total_amount,
            status: OrderStatus::Pending,
            payment_method: new.payment_method,
            payment_status: PaymentStatus::Pending,
            transaction_no: None,
            note: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn total(&self) -> Money {
        Money::vnd(self.total_amount)
    }

    /// Preconditions for issuing a payment URL.
    pub fn ensure_payable(&self) -> Result<(), PaymentError> {
        if !self.total().is_positive() {
            return Err(PaymentError::InvalidAmount);
        }
        if self.payment_status == PaymentStatus::Paid {
            return Err(PaymentError::AlreadyPaid);
        }
        Ok(())
    }

    pub fn apply(&mut self, update: &PaymentUpdate) {
        self.payment_status = update.status;
        self.note = Some(update.note.clone());
        if update.transaction_no.is_some() {
            self.transaction_no = update.transaction_no.clone();
        }
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self { $(Self::$variant => $text),+ }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = PaymentError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(PaymentError::Storage(format!(
                        "unknown {} value: {}", stringify!($ty), other
                    ))),
                }
            }
        }
    };
}

text_enum!(OrderStatus {
    Pending => "PENDING",
    Confirmed => "CONFIRMED",
    Shipping => "SHIPPING",
    Delivered => "DELIVERED",
    Cancelled => "CANCELLED",
});

text_enum!(PaymentMethod {
    Cod => "COD",
    Vnpay => "VNPAY",
});

text_enum!(PaymentStatus {
    Pending => "PENDING",
    Paid => "PAID",
    Failed => "FAILED",
});
