//! Canonical query signing for the VNPay protocol.
//!
//! The signed string is built from the parameter map in ascending byte order of
//! its keys, skipping empty values, as `key=encode(value)` pairs joined by `&`.
//! The redirect query uses the same pairs with the key encoded as well.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::collections::BTreeMap;
use url::form_urlencoded;

use crate::{PaymentError, Result};

type HmacSha512 = Hmac<Sha512>;

/// Parameter map ordered by key bytes.
pub type Params = BTreeMap<String, String>;

/// Form-urlencodes an ASCII value. Non-ASCII input is rejected rather than substituted.
pub fn percent_encode(value: &str) -> Result<String> {
    if !value.is_ascii() {
        return Err(PaymentError::Encoding(format!(
            "value is not representable in US-ASCII: {value:?}"
        )));
    }
    Ok(form_urlencoded::byte_serialize(value.as_bytes()).collect())
}

fn join_pairs(params: &Params, encode_key: bool) -> Result<String> {
    let mut pairs = Vec::with_capacity(params.len());
    for (key, value) in params.iter().filter(|(_, v)| !v.is_empty()) {
        let key = if encode_key {
            percent_encode(key)?
        } else {
            key.clone()
        };
        pairs.push(format!("{key}={}", percent_encode(value)?));
    }
    Ok(pairs.join("&"))
}

/// The exact input to [`sign`].
pub fn canonicalize(params: &Params) -> Result<String> {
    join_pairs(params, false)
}

/// The query string for the redirect URL, without the signature.
pub fn encode_query(params: &Params) -> Result<String> {
    join_pairs(params, true)
}

/// HMAC-SHA512 of `canonical` under `secret`, as 128 lowercase hex characters.
pub fn sign(secret: &str, canonical: &str) -> Result<String> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::Crypto(e.to_string()))?;
    mac.update(canonical.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Recomputes the signature of `params` and compares it to `claimed`, case-sensitively.
///
/// A value that cannot be canonicalized is an error, not a mismatch.
pub fn verify(secret: &str, params: &Params, claimed: &str) -> Result<bool> {
    let expected = sign(secret, &canonicalize(params)?)?;
    Ok(constant_time_eq(expected.as_bytes(), claimed.as_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
