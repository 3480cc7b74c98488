//! HTTP surface.

use axum::{
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::MerchantConfig;
use crate::notify::{NotificationDispatcher, Notifier};
use crate::payment::{CallbackValidator, PaymentInitiator, PaymentReconciler, PaymentUrlBuilder};
use crate::repository::OrderRepositoryRef;

pub mod error;
pub mod orders;
pub mod payment;

#[derive(Clone)]
pub struct AppState {
    pub orders: OrderRepositoryRef,
    pub initiator: PaymentInitiator,
    pub reconciler: PaymentReconciler,
}

impl AppState {
    pub fn new(
        merchant: Arc<MerchantConfig>,
        orders: OrderRepositoryRef,
        notifier: Arc<dyn Notifier>,
        notify_timeout: Duration,
    ) -> Self {
        let notifications = NotificationDispatcher::new(notifier, notify_timeout);
        let initiator = PaymentInitiator::new(
            PaymentUrlBuilder::new(merchant.clone()),
            orders.clone(),
            notifications.clone(),
        );
        let reconciler = PaymentReconciler::new(
            CallbackValidator::new(merchant),
            orders.clone(),
            notifications,
        );
        Self {
            orders,
            initiator,
            reconciler,
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "bakery-payments"}))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/orders", post(orders::create_order))
        .route("/orders/:id", get(orders::get_order))
        .route(
            "/payment/create/:order_id",
            get(payment::create_payment_redirect).post(payment::create_payment_url),
        )
        .route("/payment/return", get(payment::payment_return))
        .route("/order/success/:id", get(orders::order_success))
        .route("/order/failed/:id", get(orders::order_failed))
        .route("/order/error", get(orders::order_error))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
