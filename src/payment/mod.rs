//! VNPay integration: request signing, redirect URLs, return-callback checks and
//! the order payment-status reconciliation driven by those callbacks.

pub mod builder;
pub mod callback;
pub mod initiator;
pub mod reconciler;
pub mod signature;

pub use builder::{PaymentRequest, PaymentUrlBuilder};
pub use callback::{CallbackParams, CallbackValidator, CallbackVerdict};
pub use initiator::PaymentInitiator;
pub use reconciler::{PaymentReconciler, ReconcileOutcome};

pub const SECURE_HASH: &str = "vnp_SecureHash";
pub const SECURE_HASH_TYPE: &str = "vnp_SecureHashType";

/// Response and transaction status code for a completed payment.
pub const SUCCESS_CODE: &str = "00";
