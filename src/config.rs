//! Process configuration, read once from the environment at startup.

use std::env;
use std::time::Duration;
use validator::Validate;

use crate::{PaymentError, Result};

pub const DEFAULT_PAY_URL: &str = "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html";

/// Merchant credentials and gateway parameters. Immutable once built.
#[derive(Clone, Debug, Validate)]
pub struct MerchantConfig {
    #[validate(length(min = 1))]
    pub hash_secret: String,
    #[validate(length(min = 1))]
    pub tmn_code: String,
    #[validate(length(min = 1))]
    pub version: String,
    #[validate(length(min = 1))]
    pub command: String,
    #[validate(url)]
    pub pay_url: String,
    #[validate(url)]
    pub return_url: String,
    #[validate(length(min = 1))]
    pub locale: String,
    #[validate(length(min = 1))]
    pub currency: String,
    #[validate(length(min = 1))]
    pub order_type: String,
    #[validate(range(min = 1, max = 1440))]
    pub expire_minutes: i64,
    /// Replay window for return callbacks; `None` disables the check.
    pub callback_max_age: Option<Duration>,
}

impl MerchantConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            hash_secret: required("VNP_HASH_SECRET")?,
            tmn_code: required("VNP_TMN_CODE")?,
            version: var_or("VNP_VERSION", "2.1.0"),
            command: var_or("VNP_COMMAND", "pay"),
            pay_url: var_or("VNP_PAY_URL", DEFAULT_PAY_URL),
            return_url: required("VNP_RETURN_URL")?,
            locale: var_or("VNP_LOCALE", "vn"),
            currency: var_or("VNP_CURR_CODE", "VND"),
            order_type: var_or("VNP_ORDER_TYPE", "other"),
            expire_minutes: parsed("VNP_EXPIRE_MINUTES")?.unwrap_or(15),
            callback_max_age: parsed("VNP_CALLBACK_MAX_AGE_SECS")?.map(Duration::from_secs),
        };
        config.check()?;
        Ok(config)
    }

    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| PaymentError::Config(e.to_string()))
    }
}

/// Service-level settings around the payment core.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub nats_url: Option<String>,
    pub nats_subject: String,
    pub notify_timeout: Duration,
    pub merchant: MerchantConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            port: parsed("PORT")?.unwrap_or(8083),
            database_url: env::var("DATABASE_URL").ok(),
            nats_url: env::var("NATS_URL").ok(),
            nats_subject: var_or("NATS_SUBJECT", "orders.payment_status"),
            notify_timeout: Duration::from_millis(parsed("NOTIFY_TIMEOUT_MS")?.unwrap_or(5000)),
            merchant: MerchantConfig::from_env()?,
        })
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).map_err(|_| PaymentError::Config(format!("{key} is not set")))
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| PaymentError::Config(format!("{key} has an invalid value: {raw}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
pub(crate) fn test_merchant() -> MerchantConfig {
    MerchantConfig {
        hash_secret: "SECRETKEY123".into(),
        tmn_code: "BAKERY01".into(),
        version: "2.1.0".into(),
        command: "pay".into(),
        pay_url: DEFAULT_PAY_URL.into(),
        return_url: "http://localhost:8083/payment/return".into(),
        locale: "vn".into(),
        currency: "VND".into(),
        order_type: "other".into(),
        expire_minutes: 15,
        callback_max_age: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_merchant() {
        assert!(test_merchant().check().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = test_merchant();
        config.pay_url = "not a url".into();
        assert!(matches!(config.check(), Err(PaymentError::Config(_))));

        let mut config = test_merchant();
        config.hash_secret.clear();
        assert!(config.check().is_err());

        let mut config = test_merchant();
        config.expire_minutes = 0;
        assert!(config.check().is_err());
    }
}
