//! Order route handlers.
//!
//! JSON API endpoints covering the full order lifecycle: checkout, payment
//! confirmation, and order history.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use heartwood_core::OrderId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::services::orders::PlaceOrderRequest;
use crate::state::AppState;

/// Response from placing an order.
#[derive(Debug, Serialize)]
pub struct PlaceOrderResponse {
    /// The persisted order, still pending payment.
    pub order: Order,
    /// Gateway-hosted checkout page the client must redirect to.
    pub url: String,
}

/// Request to confirm payment after the gateway redirect.
#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub session_id: String,
}

/// Place a new order and open a checkout session.
///
/// POST /orders
///
/// # Errors
///
/// Returns 400 for an invalid cart, 502 if the gateway is unreachable.
#[instrument(skip_all, fields(user = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<PlaceOrderResponse>)> {
    let placed = state.orders().place_order(&user, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(PlaceOrderResponse {
            order: placed.order,
            url: placed.redirect_url,
        }),
    ))
}

/// List the authenticated user's orders, newest first.
///
/// GET /orders/myorders
///
/// # Errors
///
/// Returns 500 if the database query fails.
#[instrument(skip_all, fields(user = %user.id))]
pub async fn my_orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = state.orders().list_orders_for_user(&user).await?;
    Ok(Json(orders))
}

/// Fetch a single order.
///
/// GET /orders/{id}
///
/// Only the order's owner or an admin may view it.
///
/// # Errors
///
/// Returns 404 if the order does not exist, 403 for another user's order.
#[instrument(skip_all, fields(user = %user.id, order = %id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = state.orders().get_order(id, &user).await?;
    Ok(Json(order))
}

/// Confirm payment for the order tied to a checkout session.
///
/// PUT /orders/verify-payment
///
/// The gateway is the confirmation authority; the session id from the
/// redirect is only a lookup key.
///
/// # Errors
///
/// Returns 402 while payment is incomplete, 410 for an expired session.
#[instrument(skip_all, fields(user = %user.id))]
pub async fn verify_payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<Order>> {
    let order = state.orders().confirm_payment(&request.session_id).await?;
    Ok(Json(order))
}

/// Mark an order paid without a gateway session (admin only).
///
/// PUT /orders/{id}/pay
///
/// # Errors
///
/// Returns 403 for non-admin callers, 404 if the order does not exist.
#[instrument(skip_all, fields(user = %user.id, order = %id))]
pub async fn mark_paid(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = state.orders().mark_paid(id, &user).await?;
    Ok(Json(order))
}
