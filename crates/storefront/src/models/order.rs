//! Order domain types.
//!
//! An order is an immutable historical record of a cart submission: line
//! items are snapshotted from the catalog at creation time and never change,
//! even if the catalog item is later edited or deleted. Payment state is the
//! only mutable part, and only the order service writes it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use heartwood_core::{CurrencyCode, OrderId, OrderStatus, ProductId, UserId};

/// A persisted order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// Purchasing user; immutable after creation.
    pub user_id: UserId,
    /// Line items in cart order, snapshotted at creation.
    pub items: Vec<OrderItem>,
    /// Where the order ships.
    pub shipping_address: ShippingAddress,
    /// Sum of `unit_price * quantity` over all items.
    pub items_subtotal: Decimal,
    /// Flat shipping fee applied at placement time.
    pub shipping_cost: Decimal,
    /// Always equals `items_subtotal + shipping_cost`.
    pub total_price: Decimal,
    /// Currency for all monetary fields.
    pub currency: CurrencyCode,
    /// Lifecycle state.
    pub status: OrderStatus,
    /// Gateway checkout session backing this order.
    pub checkout_session_id: String,
    /// Convenience flag; true iff `status` is `Paid`.
    pub is_paid: bool,
    /// When payment confirmation was observed. Set exactly once.
    pub paid_at: Option<DateTime<Utc>>,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
}

/// A single order line, snapshotted from the catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Catalog product this line was created from.
    pub product_id: ProductId,
    /// Display name at purchase time.
    pub name: String,
    /// Per-unit price in major currency units at purchase time.
    pub unit_price: Decimal,
    /// Number of units. Always >= 1.
    pub quantity: u32,
    /// Product image at purchase time, if any.
    pub image_url: Option<String>,
}

/// Shipping address captured at checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub contact_number: Option<String>,
}

/// Input to the order store for creating a `Pending` order.
///
/// Built by the order service after validation, price recomputation, and
/// checkout-session creation. The ID is assigned up front so the gateway
/// metadata and the stored record agree.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub items_subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total_price: Decimal,
    pub currency: CurrencyCode,
    pub checkout_session_id: String,
}
