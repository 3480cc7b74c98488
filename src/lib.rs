//! Bakery storefront payment core
//!
//! Checkout against the VNPay gateway for a bakery e-commerce storefront.
//!
//! ## Features
//! - Signed payment redirect URLs (HMAC-SHA512 over a canonical query)
//! - Return-callback verification
//! - Order payment-status reconciliation with compare-and-set writes
//! - Post-commit payment status notifications
//! - HTTP surface for checkout redirects and result pages

use thiserror::Error;

pub mod api;
pub mod config;
pub mod domain;
pub mod notify;
pub mod payment;
pub mod repository;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Invalid order amount")]
    InvalidAmount,

    #[error("Invalid order reference")]
    InvalidOrderReference,

    #[error("Order is already paid")]
    AlreadyPaid,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Callback is older than the accepted window")]
    StaleCallback,

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Signing error: {0}")]
    Crypto(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Business rule violations the caller can correct; everything else aborts the request.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount | Self::InvalidOrderReference | Self::AlreadyPaid
        )
    }
}

impl From<sqlx::Error> for PaymentError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;
