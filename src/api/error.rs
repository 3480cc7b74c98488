use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::PaymentError;

/// Plain-text error response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

impl From<PaymentError> for ApiError {
    fn from(e: PaymentError) -> Self {
        match e {
            PaymentError::InvalidAmount
            | PaymentError::AlreadyPaid
            | PaymentError::InvalidOrderReference => {
                Self::new(StatusCode::BAD_REQUEST, flash_message(&e))
            }
            PaymentError::OrderNotFound => Self::new(StatusCode::NOT_FOUND, flash_message(&e)),
            other => {
                error!(error = %other, "request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Error creating payment")
            }
        }
    }
}

/// User-facing text for a failed payment start, shown on the order page.
pub fn flash_message(e: &PaymentError) -> &'static str {
    match e {
        PaymentError::OrderNotFound => "Order not found",
        PaymentError::InvalidAmount => "Invalid order amount",
        PaymentError::AlreadyPaid => "Order is already paid",
        PaymentError::InvalidOrderReference => "Invalid order reference",
        _ => "Payment could not be created",
    }
}
