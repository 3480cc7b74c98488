//! Order placement and the order/result pages the payment flow redirects to.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::error::ApiError;
use super::AppState;
use crate::domain::aggregates::{NewOrder, Order, PaymentMethod};
use crate::PaymentError;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(email)]
    pub customer_email: String,
    #[validate(custom = "valid_total")]
    pub total_amount: Decimal,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

/// Non-negative, with at most two fraction digits so it converts exactly to minor units.
fn valid_total(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() {
        return Err(ValidationError::new("negative_amount"));
    }
    if amount.normalize().scale() > 2 {
        return Err(ValidationError::new("too_many_fraction_digits"));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct FlashParams {
    pub error: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderPage {
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResultPage {
    pub order: Order,
    pub payment_success: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorPage {
    pub payment_error: bool,
    pub message: String,
}

pub async fn create_order(
    State(s): State<AppState>,
    Json(r): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    r.validate()
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;
    let order = s
        .orders
        .create(NewOrder {
            customer_email: r.customer_email,
            total_amount: r.total_amount,
            payment_method: r.payment_method,
        })
        .await?;
    tracing::info!(order_id = order.id, "order placed");
    Ok((StatusCode::CREATED, Json(order)))
}

async fn load(s: &AppState, id: i64) -> Result<Order, ApiError> {
    Ok(s.orders
        .find_by_id(id)
        .await?
        .ok_or(PaymentError::OrderNotFound)?)
}

pub async fn get_order(
    State(s): State<AppState>,
    Path(id): Path<i64>,
    Query(flash): Query<FlashParams>,
) -> Result<Json<OrderPage>, ApiError> {
    let order = load(&s, id).await?;
    Ok(Json(OrderPage {
        order,
        error: flash.error,
    }))
}

pub async fn order_success(
    State(s): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PaymentResultPage>, ApiError> {
    let order = load(&s, id).await?;
    Ok(Json(PaymentResultPage {
        order,
        payment_success: true,
    }))
}

pub async fn order_failed(
    State(s): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PaymentResultPage>, ApiError> {
    let order = load(&s, id).await?;
    Ok(Json(PaymentResultPage {
        order,
        payment_success: false,
    }))
}

pub async fn order_error(Query(flash): Query<FlashParams>) -> Json<ErrorPage> {
    Json(ErrorPage {
        payment_error: true,
        message: flash
            .message
            .unwrap_or_else(|| "Payment processing error".to_string()),
    })
}
