//! Checkout session types for the hosted payment gateway.

use serde::Deserialize;

use heartwood_core::{CurrencyCode, Email, UserId};

/// A hosted checkout session as reported by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Opaque session identifier.
    pub id: String,
    /// Redirect URL for the customer. Present while the session is open.
    pub url: Option<String>,
    /// Session state (open, complete, expired).
    pub status: SessionState,
    /// Payment state (paid, unpaid, no payment required).
    pub payment_status: SessionPaymentStatus,
}

/// Session lifecycle state at the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Open,
    Complete,
    Expired,
}

/// Payment state of a checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
}

impl SessionPaymentStatus {
    /// Whether the gateway considers the session settled.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Paid | Self::NoPaymentRequired)
    }
}

/// One line of a checkout session, in gateway representation.
///
/// `unit_amount` is the per-unit price in integer minor units (paise/cents),
/// already rounded half-up. `image_url` is present only when the image is an
/// absolute, publicly reachable URL; gateways reject loopback hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLineItem {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: u32,
    pub image_url: Option<String>,
}

/// Request to create a hosted checkout session.
#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    pub line_items: Vec<CheckoutLineItem>,
    pub currency: CurrencyCode,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: Email,
    /// Internal user ID, attached as session metadata.
    pub user_id: UserId,
}
