//! Signed gateway redirect URLs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

use super::signature::{self, Params};
use super::SECURE_HASH;
use crate::config::MerchantConfig;
use crate::domain::value_objects::{GatewayTimestamp, Money, TxnRef};
use crate::Result;

/// Inputs for one redirect URL.
#[derive(Clone, Debug)]
pub struct PaymentRequest<'a> {
    pub order_id: &'a str,
    /// Order total in major currency units.
    pub amount: Decimal,
    pub client_ip: &'a str,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct PaymentUrlBuilder {
    config: Arc<MerchantConfig>,
}

impl PaymentUrlBuilder {
    pub fn new(config: Arc<MerchantConfig>) -> Self {
        Self { config }
    }

    /// The full parameter set sent to the gateway, before signing.
    pub fn params(&self, request: &PaymentRequest<'_>) -> Result<Params> {
        let total = Money::new(request.amount, &self.config.currency);
        let amount = total.to_minor_units()?;
        let txn_ref = TxnRef::new(request.order_id)?;
        let created = GatewayTimestamp::new(request.created_at);
        let expires = created.plus_minutes(self.config.expire_minutes);

        let c = &self.config;
        let params: Params = [
            ("vnp_Version", c.version.clone()),
            ("vnp_Command", c.command.clone()),
            ("vnp_TmnCode", c.tmn_code.clone()),
            ("vnp_Amount", amount.to_string()),
            ("vnp_CurrCode", total.currency().to_string()),
            ("vnp_TxnRef", txn_ref.to_string()),
            ("vnp_OrderInfo", format!("Thanh toan don hang: {}", request.order_id)),
            ("vnp_OrderType", c.order_type.clone()),
            ("vnp_ReturnUrl", c.return_url.clone()),
            ("vnp_IpAddr", request.client_ip.to_string()),
            ("vnp_CreateDate", created.to_string()),
            ("vnp_ExpireDate", expires.to_string()),
            ("vnp_Locale", c.locale.clone()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Ok(params)
    }

    /// `pay_url?<query>&vnp_SecureHash=<hmac>`. Pure construction; nothing is sent.
    pub fn build(&self, request: &PaymentRequest<'_>) -> Result<String> {
        let params = self.params(request)?;
        let canonical = signature::canonicalize(&params)?;
        let secure_hash = signature::sign(&self.config.hash_secret, &canonical)?;
        let query = signature::encode_query(&params)?;
        Ok(format!(
            "{}?{query}&{SECURE_HASH}={secure_hash}",
            self.config.pay_url
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_merchant;
    use crate::PaymentError;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use url::Url;

    fn builder() -> PaymentUrlBuilder {
        PaymentUrlBuilder::new(Arc::new(test_merchant()))
    }

    fn request(order_id: &str, amount: Decimal) -> PaymentRequest<'_> {
        PaymentRequest {
            order_id,
            amount,
            client_ip: "203.0.113.9",
            created_at: Utc.with_ymd_and_hms(2024, 5, 10, 3, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_amount_and_reference() {
        let params = builder().params(&request("1024", dec!(150000.00))).unwrap();
        assert_eq!(params["vnp_Amount"], "15000000");
        assert_eq!(params["vnp_TxnRef"], "1024");
        assert_eq!(params["vnp_OrderInfo"], "Thanh toan don hang: 1024");
        assert_eq!(params["vnp_IpAddr"], "203.0.113.9");
        assert_eq!(params.len(), 13);
    }

    #[test]
    fn test_timestamps_in_gateway_zone() {
        let params = builder().params(&request("1024", dec!(1))).unwrap();
        assert_eq!(params["vnp_CreateDate"], "20240510100000");
        assert_eq!(params["vnp_ExpireDate"], "20240510101500");
    }

    #[test]
    fn test_rejects_invalid_inputs() {
        let build = |order_id, amount| builder().build(&request(order_id, amount));
        assert!(matches!(build("1024", dec!(0)), Err(PaymentError::InvalidAmount)));
        assert!(matches!(build("1024", dec!(-1)), Err(PaymentError::InvalidAmount)));
        assert!(matches!(build("1024", dec!(0.001)), Err(PaymentError::InvalidAmount)));
        assert!(matches!(build("#-#", dec!(10)), Err(PaymentError::InvalidOrderReference)));
    }

    #[test]
    fn test_url_is_signed_over_query_params() {
        let url = builder().build(&request("1024", dec!(150000.00))).unwrap();
        assert!(url.starts_with("https://sandbox.vnpayment.vn/paymentv2/vpcpay.html?"));

        let parsed = Url::parse(&url).unwrap();
        let mut params: Params = parsed.query_pairs().into_owned().collect();
        let hash = params.remove(SECURE_HASH).unwrap();
        assert_eq!(hash.len(), 128);
        assert!(signature::verify("SECRETKEY123", &params, &hash).unwrap());
        assert_eq!(params["vnp_ReturnUrl"], "http://localhost:8083/payment/return");
    }

    #[test]
    fn test_hash_is_last_parameter() {
        let url = builder().build(&request("1024", dec!(5))).unwrap();
        let (_, tail) = url.rsplit_once('&').unwrap();
        assert!(tail.starts_with("vnp_SecureHash="));
    }
}
