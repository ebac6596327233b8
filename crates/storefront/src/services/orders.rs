//! Order lifecycle service.
//!
//! Owns the `Order` entity and its state transitions. Talks to two
//! collaborators: the payment gateway (hosted checkout) and the order store.
//! No other component writes an order's payment state.
//!
//! The lifecycle is `Pending` -> `Paid` (terminal), with `Expired` and
//! `Canceled` closing out sessions that will never be paid. Every transition
//! is a compare-and-set against `Pending`, so concurrent confirmations for
//! the same order converge to exactly one effective transition.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use url::{Host, Url};

use heartwood_core::{CurrencyCode, OrderStatus, OrderId, Price, ProductId};

use crate::db::{OrderStore, ProductCatalog, RepositoryError};
use crate::models::order::{NewOrder, Order, OrderItem, ShippingAddress};
use crate::models::session::CurrentUser;
use crate::payments::{
    CheckoutLineItem, CreateSessionRequest, PaymentError, PaymentGateway, SessionState,
};

/// Errors from order lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    /// The request failed validation before any external call.
    #[error("{0}")]
    Validation(String),

    /// No order matches the given identifier or session ID.
    #[error("order not found")]
    NotFound,

    /// The requester neither owns the order nor holds the admin capability.
    #[error("not authorized to access this order")]
    NotAuthorized,

    /// The gateway has not (yet) observed payment for this session.
    #[error("payment has not completed for this checkout session")]
    PaymentIncomplete,

    /// The checkout session expired before payment; the order is closed out.
    #[error("checkout session has expired")]
    SessionExpired,

    /// Payment gateway failure.
    #[error(transparent)]
    Gateway(#[from] PaymentError),

    /// Persistence failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Checkout behavior configured from the environment.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Public URL of the browser client, for post-payment redirects.
    pub frontend_url: String,
    /// Currency for all orders.
    pub currency: CurrencyCode,
    /// Flat shipping fee applied to every non-empty cart, in major units.
    pub shipping_flat_rate: Decimal,
}

/// Cart submission payload, validated at the boundary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub order_items: Vec<OrderItemRequest>,
    pub shipping_address: ShippingAddressRequest,
    /// Client-computed figures; verified against server-side recomputation,
    /// never trusted.
    pub items_subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total_price: Decimal,
}

/// One cart line. Prices are looked up in the catalog, not accepted here.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemRequest {
    pub product: ProductId,
    pub quantity: u32,
}

/// Shipping address payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressRequest {
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub contact_number: Option<String>,
}

/// Result of a successful `PlaceOrder`.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    /// Gateway-hosted page the client must be redirected to.
    pub redirect_url: String,
}

/// The order lifecycle manager.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    catalog: Arc<dyn ProductCatalog>,
    settings: CheckoutSettings,
}

impl OrderService {
    /// Create a new order service.
    #[must_use]
    pub fn new(
        store: Arc<dyn OrderStore>,
        gateway: Arc<dyn PaymentGateway>,
        catalog: Arc<dyn ProductCatalog>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            store,
            gateway,
            catalog,
            settings,
        }
    }

    /// Place an order: validate, snapshot catalog prices, open a checkout
    /// session, and persist a `Pending` order.
    ///
    /// All-or-nothing: a gateway failure persists nothing, and a persistence
    /// failure after session creation expires the session (best effort)
    /// before surfacing the error. The operation is not retried once a
    /// session exists.
    ///
    /// # Errors
    ///
    /// `Validation` for empty carts, incomplete addresses, unknown products,
    /// or pricing that does not match the server-side recomputation;
    /// `Gateway` and `Repository` for collaborator failures.
    #[instrument(skip(self, request), fields(user = %user.id, lines = request.order_items.len()))]
    pub async fn place_order(
        &self,
        user: &CurrentUser,
        request: PlaceOrderRequest,
    ) -> Result<PlacedOrder, OrderError> {
        let shipping_address = validate_request(&request)?;

        // Snapshot names and prices from the catalog; client prices are
        // display-only.
        let mut items = Vec::with_capacity(request.order_items.len());
        for line in &request.order_items {
            let product = self
                .catalog
                .get(line.product)
                .await?
                .ok_or_else(|| OrderError::Validation(format!("unknown product: {}", line.product)))?;

            items.push(OrderItem {
                product_id: product.id,
                name: product.name,
                unit_price: product.price,
                quantity: line.quantity,
                image_url: product.image_url,
            });
        }

        let items_subtotal: Decimal = items
            .iter()
            .map(|i| i.unit_price * Decimal::from(i.quantity))
            .sum();
        let shipping_cost = self.settings.shipping_flat_rate;
        let total_price = items_subtotal + shipping_cost;

        if request.items_subtotal != items_subtotal
            || request.shipping_cost != shipping_cost
            || request.total_price != total_price
        {
            return Err(OrderError::Validation(format!(
                "pricing mismatch: expected subtotal {items_subtotal}, shipping {shipping_cost}, total {total_price}"
            )));
        }

        let line_items = items
            .iter()
            .map(|item| {
                let unit_amount = Price::new(item.unit_price, self.settings.currency)
                    .minor_units()
                    .map_err(|e| OrderError::Validation(e.to_string()))?;
                Ok(CheckoutLineItem {
                    name: item.name.clone(),
                    unit_amount,
                    quantity: item.quantity,
                    image_url: item.image_url.as_deref().and_then(public_image_url),
                })
            })
            .collect::<Result<Vec<_>, OrderError>>()?;

        let frontend = self.settings.frontend_url.trim_end_matches('/');
        let session = self
            .gateway
            .create_checkout_session(CreateSessionRequest {
                line_items,
                currency: self.settings.currency,
                success_url: format!(
                    "{frontend}/profile?success=true&session_id={{CHECKOUT_SESSION_ID}}"
                ),
                cancel_url: format!("{frontend}/cart?canceled=true"),
                customer_email: user.email.clone(),
                user_id: user.id,
            })
            .await?;

        let redirect_url = session.url.clone().ok_or_else(|| {
            PaymentError::InvalidResponse("created session is missing a redirect URL".to_owned())
        })?;

        let new_order = NewOrder {
            id: OrderId::generate(),
            user_id: user.id,
            items,
            shipping_address,
            items_subtotal,
            shipping_cost,
            total_price,
            currency: self.settings.currency,
            checkout_session_id: session.id.clone(),
        };

        match self.store.insert(new_order).await {
            Ok(order) => {
                info!(order = %order.id, session = %session.id, "order placed");
                Ok(PlacedOrder {
                    order,
                    redirect_url,
                })
            }
            Err(e) => {
                // Compensate: an unrecorded order must not stay payable.
                if let Err(expire_err) = self.gateway.expire_session(&session.id).await {
                    warn!(
                        session = %session.id,
                        error = %expire_err,
                        "failed to expire session after persistence failure"
                    );
                }
                Err(e.into())
            }
        }
    }

    /// Confirm payment for the order holding `session_id`.
    ///
    /// Idempotent: an already-`Paid` order is returned unchanged, without a
    /// gateway call. Otherwise the gateway's session status is the
    /// authority; redirect query parameters are never trusted. Safe to call
    /// concurrently for the same order.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown session IDs, `PaymentIncomplete` while the
    /// session is open and unpaid, `SessionExpired` once the gateway has
    /// expired it.
    #[instrument(skip(self))]
    pub async fn confirm_payment(&self, session_id: &str) -> Result<Order, OrderError> {
        if session_id.trim().is_empty() {
            return Err(OrderError::Validation("session id is required".to_owned()));
        }

        let order = self
            .store
            .find_by_session(session_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        match order.status {
            OrderStatus::Paid => return Ok(order),
            OrderStatus::Expired => return Err(OrderError::SessionExpired),
            OrderStatus::Canceled => {
                return Err(OrderError::Validation("order has been canceled".to_owned()));
            }
            OrderStatus::Pending => {}
        }

        let session = self.gateway.retrieve_session(session_id).await?;

        if session.payment_status.is_settled() {
            let won = self
                .store
                .transition_from_pending(order.id, OrderStatus::Paid, Some(Utc::now()))
                .await?;
            info!(order = %order.id, won, "payment confirmed");

            // Loser of a concurrent confirmation reads the winner's state,
            // which may be an expire or cancel rather than Paid.
            let refreshed = self
                .store
                .find_by_id(order.id)
                .await?
                .ok_or(OrderError::NotFound)?;
            return match refreshed.status {
                OrderStatus::Paid => Ok(refreshed),
                OrderStatus::Expired => Err(OrderError::SessionExpired),
                OrderStatus::Canceled | OrderStatus::Pending => {
                    Err(OrderError::Validation("order has been canceled".to_owned()))
                }
            };
        }

        if session.status == SessionState::Expired {
            // Reconciliation: close out the abandoned session.
            self.store
                .transition_from_pending(order.id, OrderStatus::Expired, None)
                .await?;
            return Err(OrderError::SessionExpired);
        }

        Err(OrderError::PaymentIncomplete)
    }

    /// Mark an order paid by internal ID (administrative variant).
    ///
    /// Same idempotency and CAS rules as [`Self::confirm_payment`], without
    /// a gateway call.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` unless the actor is an admin; `NotFound` for unknown
    /// IDs; `Validation` if the order is expired or canceled.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn mark_paid(&self, order_id: OrderId, actor: &CurrentUser) -> Result<Order, OrderError> {
        if !actor.is_admin {
            return Err(OrderError::NotAuthorized);
        }

        let order = self
            .store
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        match order.status {
            OrderStatus::Paid => return Ok(order),
            OrderStatus::Expired | OrderStatus::Canceled => {
                return Err(OrderError::Validation(format!(
                    "order is {}, cannot mark paid",
                    order.status
                )));
            }
            OrderStatus::Pending => {}
        }

        self.store
            .transition_from_pending(order_id, OrderStatus::Paid, Some(Utc::now()))
            .await?;

        let refreshed = self
            .store
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        // A concurrent expire or cancel may have won the transition.
        if refreshed.status != OrderStatus::Paid {
            return Err(OrderError::Validation(format!(
                "order is {}, cannot mark paid",
                refreshed.status
            )));
        }

        Ok(refreshed)
    }

    /// Fetch a single order, enforcing ownership.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown IDs; `NotAuthorized` unless the actor owns the
    /// order or is an admin.
    pub async fn get_order(&self, order_id: OrderId, actor: &CurrentUser) -> Result<Order, OrderError> {
        let order = self
            .store
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        if order.user_id != actor.id && !actor.is_admin {
            return Err(OrderError::NotAuthorized);
        }

        Ok(order)
    }

    /// All orders owned by the actor, most recent first.
    ///
    /// # Errors
    ///
    /// `Repository` on persistence failure.
    pub async fn list_orders_for_user(&self, actor: &CurrentUser) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.list_for_user(actor.id).await?)
    }
}

/// Validate a cart submission before any external call.
fn validate_request(request: &PlaceOrderRequest) -> Result<ShippingAddress, OrderError> {
    if request.order_items.is_empty() {
        return Err(OrderError::Validation("no order items".to_owned()));
    }

    if request.order_items.iter().any(|line| line.quantity == 0) {
        return Err(OrderError::Validation(
            "item quantity must be at least 1".to_owned(),
        ));
    }

    // Quantities are stored as i32; reject anything larger here rather than
    // after a gateway session has been opened.
    if request
        .order_items
        .iter()
        .any(|line| i32::try_from(line.quantity).is_err())
    {
        return Err(OrderError::Validation(
            "item quantity is too large".to_owned(),
        ));
    }

    let addr = &request.shipping_address;
    let required = [
        ("street", &addr.street),
        ("city", &addr.city),
        ("postalCode", &addr.postal_code),
        ("country", &addr.country),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(OrderError::Validation(format!(
                "please provide a complete shipping address: missing {field}"
            )));
        }
    }

    Ok(ShippingAddress {
        street: addr.street.trim().to_owned(),
        city: addr.city.trim().to_owned(),
        postal_code: addr.postal_code.trim().to_owned(),
        country: addr.country.trim().to_owned(),
        contact_number: addr
            .contact_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned),
    })
}

/// Return the URL if it is absolute, http(s), and publicly reachable.
///
/// Gateways reject image URLs pointing at loopback hosts, so those line
/// items are submitted without an image.
fn public_image_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;

    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    match url.host()? {
        Host::Domain(domain) if domain.eq_ignore_ascii_case("localhost") => None,
        Host::Ipv4(ip) if ip.is_loopback() => None,
        Host::Ipv6(ip) if ip.is_loopback() => None,
        _ => Some(raw.to_owned()),
    }
}
