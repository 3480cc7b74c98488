//! Checkout redirect and gateway return handlers.

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::net::SocketAddr;
use tracing::warn;

use super::error::{flash_message, ApiError};
use super::AppState;
use crate::domain::aggregates::PaymentStatus;
use crate::payment::{CallbackParams, ReconcileOutcome};
use crate::PaymentError;
use url::form_urlencoded;

const FALLBACK_IP: &str = "127.0.0.1";

const IP_HEADERS: [&str; 5] = [
    "x-forwarded-for",
    "proxy-client-ip",
    "wl-proxy-client-ip",
    "http_client_ip",
    "http_x_forwarded_for",
];

/// The originating client address: first usable proxy header, then the peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    IP_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name)?.to_str().ok())
        .map(|value| value.split(',').next().unwrap_or("").trim())
        .find(|value| !value.is_empty() && !value.eq_ignore_ascii_case("unknown"))
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| FALLBACK_IP.to_string())
}

/// 302 Found, which the gateway and browsers follow with a GET.
pub fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

fn with_query(path: &str, key: &str, value: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(key, value)
        .finish();
    format!("{path}?{query}")
}

pub async fn create_payment_redirect(
    State(s): State<AppState>,
    Path(order_id): Path<String>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    let Ok(order_id) = order_id.parse::<i64>() else {
        return found(with_query(
            "/order/error",
            "message",
            flash_message(&PaymentError::InvalidOrderReference),
        ));
    };
    let ip = client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));
    match s.initiator.initiate(order_id, &ip).await {
        Ok(url) => found(url),
        Err(e @ PaymentError::OrderNotFound) => {
            found(with_query("/order/error", "message", flash_message(&e)))
        }
        Err(e) => {
            if !e.is_precondition() {
                warn!(order_id, error = %e, "payment url could not be created");
            }
            found(with_query(&format!("/orders/{order_id}"), "error", flash_message(&e)))
        }
    }
}

pub async fn create_payment_url(
    State(s): State<AppState>,
    Path(order_id): Path<i64>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> Result<Json<String>, ApiError> {
    let ip = client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));
    let url = s.initiator.initiate(order_id, &ip).await?;
    Ok(Json(url))
}

pub async fn payment_return(
    State(s): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    match s.reconciler.reconcile(&params).await {
        Ok(ReconcileOutcome::Paid { order_id })
        | Ok(ReconcileOutcome::Unchanged { order_id, status: PaymentStatus::Paid }) => {
            found(format!("/order/success/{order_id}"))
        }
        Ok(ReconcileOutcome::Failed { order_id, .. })
        | Ok(ReconcileOutcome::Unchanged { order_id, status: PaymentStatus::Failed }) => {
            found(format!("/order/failed/{order_id}"))
        }
        Ok(ReconcileOutcome::Unchanged { order_id, .. }) => found(format!("/orders/{order_id}")),
        Err(e) => {
            warn!(error = %e, "payment callback rejected");
            found(with_query("/order/error", "message", "Payment processing error"))
        }
    }
}
