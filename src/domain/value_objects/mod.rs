//! Value Objects for payments

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::PaymentError;

/// Gateway transaction reference: the order id with everything outside `[A-Za-z0-9]` removed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxnRef(String);

impl TxnRef {
    pub fn new(order_id: impl AsRef<str>) -> Result<Self, PaymentError> {
        let value: String = order_id
            .as_ref()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        if value.is_empty() {
            return Err(PaymentError::InvalidOrderReference);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Maps the reference back to an internal order id.
    pub fn order_id(&self) -> Result<i64, PaymentError> {
        self.0
            .parse()
            .map_err(|_| PaymentError::InvalidOrderReference)
    }
}

impl fmt::Display for TxnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self {
        Self {
            amount,
            currency: currency.to_string(),
        }
    }
    pub fn vnd(amount: Decimal) -> Self {
        Self::new(amount, "VND")
    }
    pub fn currency(&self) -> &str {
        &self.currency
    }
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Gateway amount: major units x100 as an integer. Positive and exactly representable only.
    pub fn to_minor_units(&self) -> Result<i64, PaymentError> {
        if !self.is_positive() {
            return Err(PaymentError::InvalidAmount);
        }
        let minor = self
            .amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or(PaymentError::InvalidAmount)?;
        if !minor.fract().is_zero() {
            return Err(PaymentError::InvalidAmount);
        }
        minor.trunc().to_i64().ok_or(PaymentError::InvalidAmount)
    }
}

/// The gateway's operating zone, UTC+7.
pub const GATEWAY_OFFSET: FixedOffset = match FixedOffset::east_opt(7 * 3600) {
    Some(offset) => offset,
    None => panic!("invalid gateway offset"),
};

const GATEWAY_FORMAT: &str = "%Y%m%d%H%M%S";

/// `yyyyMMddHHmmss` timestamp pinned to UTC+7, independent of the host zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct GatewayTimestamp(DateTime<Utc>);

impl GatewayTimestamp {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    pub fn parse(value: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(value, GATEWAY_FORMAT)
            .ok()?
            .and_local_timezone(GATEWAY_OFFSET)
            .single()
            .map(|at| Self(at.with_timezone(&Utc)))
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn plus_minutes(&self, minutes: i64) -> Self {
        Self(self.0 + chrono::Duration::minutes(minutes))
    }
}

impl fmt::Display for GatewayTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.0.with_timezone(&GATEWAY_OFFSET).format(GATEWAY_FORMAT)
        )
    }
}
