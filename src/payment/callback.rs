//! Return-callback verification.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use super::signature::{self, Params};
use super::{SECURE_HASH, SECURE_HASH_TYPE, SUCCESS_CODE};
use crate::config::MerchantConfig;
use crate::domain::value_objects::{GatewayTimestamp, TxnRef};
use crate::{PaymentError, Result};

/// Query parameters the gateway appends to the return URL.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct CallbackParams(Params);

impl CallbackParams {
    pub fn new(params: Params) -> Self {
        Self(params)
    }

    fn field(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn txn_ref(&self) -> Result<TxnRef> {
        self.field("vnp_TxnRef")
            .ok_or(PaymentError::InvalidOrderReference)
            .and_then(TxnRef::new)
    }

    pub fn response_code(&self) -> Option<&str> {
        self.field("vnp_ResponseCode")
    }

    pub fn transaction_status(&self) -> Option<&str> {
        self.field("vnp_TransactionStatus")
    }

    pub fn transaction_no(&self) -> Option<&str> {
        self.field("vnp_TransactionNo")
    }

    pub fn secure_hash(&self) -> Option<&str> {
        self.field(SECURE_HASH)
    }

    /// When the gateway says the payment happened, falling back to the request creation time.
    pub fn timestamp(&self) -> Option<GatewayTimestamp> {
        self.field("vnp_PayDate")
            .or_else(|| self.field("vnp_CreateDate"))
            .and_then(GatewayTimestamp::parse)
    }

    /// Everything the signature covers.
    pub fn signed_params(&self) -> Params {
        let mut params = self.0.clone();
        params.remove(SECURE_HASH);
        params.remove(SECURE_HASH_TYPE);
        params
    }
}

impl From<Params> for CallbackParams {
    fn from(params: Params) -> Self {
        Self(params)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackVerdict {
    Empty,
    MissingSignature,
    SignatureMismatch,
    /// Authentic, but the gateway reports the payment did not succeed.
    Declined {
        response_code: Option<String>,
        transaction_status: Option<String>,
    },
    Approved,
}

impl CallbackVerdict {
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }

    pub fn is_authentic(&self) -> bool {
        matches!(self, Self::Approved | Self::Declined { .. })
    }
}

#[derive(Clone, Debug)]
pub struct CallbackValidator {
    config: Arc<MerchantConfig>,
}

impl CallbackValidator {
    pub fn new(config: Arc<MerchantConfig>) -> Self {
        Self { config }
    }

    /// Classifies a callback. Fails only when the signature cannot be recomputed.
    pub fn verify(&self, params: &CallbackParams) -> Result<CallbackVerdict> {
        if params.is_empty() {
            return Ok(CallbackVerdict::Empty);
        }
        let Some(claimed) = params.secure_hash() else {
            return Ok(CallbackVerdict::MissingSignature);
        };
        let signed = params.signed_params();
        if signed.values().all(String::is_empty)
            || !signature::verify(&self.config.hash_secret, &signed, claimed)?
        {
            return Ok(CallbackVerdict::SignatureMismatch);
        }

        let response_code = params.response_code();
        let transaction_status = params.transaction_status();
        if response_code == Some(SUCCESS_CODE) && transaction_status == Some(SUCCESS_CODE) {
            Ok(CallbackVerdict::Approved)
        } else {
            Ok(CallbackVerdict::Declined {
                response_code: response_code.map(str::to_string),
                transaction_status: transaction_status.map(str::to_string),
            })
        }
    }

    /// True only for an authentic callback reporting success.
    pub fn validate(&self, params: &CallbackParams) -> bool {
        self.verify(params).is_ok_and(|verdict| verdict.is_approved())
    }

    /// Rejects callbacks older than the configured replay window.
    pub fn check_freshness(&self, params: &CallbackParams, now: DateTime<Utc>) -> Result<()> {
        let Some(max_age) = self.config.callback_max_age else {
            return Ok(());
        };
        let max_age = chrono::Duration::from_std(max_age)
            .map_err(|e| PaymentError::Config(e.to_string()))?;
        match params.timestamp() {
            Some(at) if now - at.instant() <= max_age => Ok(()),
            _ => Err(PaymentError::StaleCallback),
        }
    }
}

#[cfg(test)]
pub(crate) fn signed_callback(secret: &str, pairs: &[(&str, &str)]) -> CallbackParams {
    let mut params: Params = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let canonical = signature::canonicalize(&params).unwrap();
    params.insert(SECURE_HASH.into(), signature::sign(secret, &canonical).unwrap());
    params.insert(SECURE_HASH_TYPE.into(), "HmacSHA512".into());
    CallbackParams::new(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_merchant;
    use chrono::TimeZone;
    use std::time::Duration;

    const SECRET: &str = "SECRETKEY123";

    fn validator() -> CallbackValidator {
        CallbackValidator::new(Arc::new(test_merchant()))
    }

    fn callback(response: &str, status: &str) -> CallbackParams {
        signed_callback(
            SECRET,
            &[
                ("vnp_Amount", "15000000"),
                ("vnp_BankCode", "NCB"),
                ("vnp_OrderInfo", "Thanh toan don hang: 1024"),
                ("vnp_PayDate", "20240510101000"),
                ("vnp_ResponseCode", response),
                ("vnp_TmnCode", "BAKERY01"),
                ("vnp_TransactionNo", "14226112"),
                ("vnp_TransactionStatus", status),
                ("vnp_TxnRef", "1024"),
            ],
        )
    }

    #[test]
    fn test_approved() {
        let params = callback("00", "00");
        assert_eq!(validator().verify(&params).unwrap(), CallbackVerdict::Approved);
        assert!(validator().validate(&params));
        assert_eq!(params.txn_ref().unwrap().order_id().unwrap(), 1024);
        assert_eq!(params.transaction_no(), Some("14226112"));
    }

    #[test]
    fn test_declined_with_valid_signature() {
        let params = callback("24", "02");
        let verdict = validator().verify(&params).unwrap();
        assert!(verdict.is_authentic());
        assert_eq!(
            verdict,
            CallbackVerdict::Declined {
                response_code: Some("24".into()),
                transaction_status: Some("02".into()),
            }
        );
        assert!(!validator().validate(&params));
    }

    #[test]
    fn test_success_response_but_pending_status_is_not_valid() {
        assert!(!validator().validate(&callback("00", "01")));
    }

    #[test]
    fn test_empty_and_unsigned() {
        assert_eq!(
            validator().verify(&CallbackParams::default()).unwrap(),
            CallbackVerdict::Empty
        );

        let mut params = callback("00", "00").signed_params();
        params.insert(SECURE_HASH.into(), String::new());
        assert_eq!(
            validator().verify(&params.into()).unwrap(),
            CallbackVerdict::MissingSignature
        );
    }

    #[test]
    fn test_tampered_amount() {
        let mut params = callback("00", "00").0;
        params.insert("vnp_Amount".into(), "100".into());
        assert_eq!(
            validator().verify(&params.into()).unwrap(),
            CallbackVerdict::SignatureMismatch
        );
    }

    #[test]
    fn test_wrong_secret() {
        let params = signed_callback(
            "another",
            &[
                ("vnp_ResponseCode", "00"),
                ("vnp_TransactionStatus", "00"),
                ("vnp_TxnRef", "1"),
            ],
        );
        assert_eq!(validator().verify(&params).unwrap(), CallbackVerdict::SignatureMismatch);
        assert!(!validator().validate(&params));
    }

    #[test]
    fn test_signature_of_only_empty_values_is_rejected() {
        let params = signed_callback(SECRET, &[("vnp_TxnRef", ""), ("vnp_ResponseCode", "")]);
        assert_eq!(validator().verify(&params).unwrap(), CallbackVerdict::SignatureMismatch);
    }

    #[test]
    fn test_signed_callback_without_result_codes_is_declined() {
        let params = signed_callback(
            SECRET,
            &[("vnp_TransactionNo", "14226112"), ("vnp_TxnRef", "1024")],
        );
        assert_eq!(
            validator().verify(&params).unwrap(),
            CallbackVerdict::Declined {
                response_code: None,
                transaction_status: None,
            }
        );
        assert!(!validator().validate(&params));
    }

    #[test]
    fn test_unencodable_value_is_an_error() {
        let mut params = callback("00", "00").0;
        params.insert("vnp_OrderInfo".into(), "Thanh toán".into());
        let params = CallbackParams::new(params);
        assert!(matches!(validator().verify(&params), Err(PaymentError::Encoding(_))));
        assert!(!validator().validate(&params));
    }

    #[test]
    fn test_freshness() {
        let mut config = test_merchant();
        config.callback_max_age = Some(Duration::from_secs(30 * 60));
        let validator = CallbackValidator::new(Arc::new(config));
        let params = callback("00", "00");

        // 10:10:00 UTC+7 == 03:10:00 UTC
        let soon = Utc.with_ymd_and_hms(2024, 5, 10, 3, 20, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 5, 10, 4, 0, 0).unwrap();
        assert!(validator.check_freshness(&params, soon).is_ok());
        assert!(matches!(
            validator.check_freshness(&params, late),
            Err(PaymentError::StaleCallback)
        ));

        let undated = signed_callback(SECRET, &[("vnp_TxnRef", "1")]);
        assert!(validator.check_freshness(&undated, soon).is_err());
    }

    #[test]
    fn test_freshness_disabled_by_default() {
        let undated = signed_callback(SECRET, &[("vnp_TxnRef", "1")]);
        assert!(validator().check_freshness(&undated, Utc::now()).is_ok());
    }
}
