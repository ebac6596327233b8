//! Order lifecycle status.

use serde::{Deserialize, Serialize};

/// Lifecycle state of an order.
///
/// An order is created `Pending` once a checkout session exists. It moves to
/// `Paid` exactly once, when payment confirmation is observed from the
/// gateway. Sessions that are abandoned at the gateway resolve to `Expired`;
/// `Canceled` is reserved for explicit administrative cancellation. All
/// states other than `Pending` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "lowercase")
)]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Expired,
    Canceled,
}

impl OrderStatus {
    /// Whether this state admits no further transitions.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether a transition from `self` to `next` is allowed.
    ///
    /// The only legal transitions are out of `Pending`.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(self, Self::Pending) && !matches!(next, Self::Pending)
    }

    /// Stable string form, matching the database enum labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Expired => "expired",
            Self::Canceled => "canceled",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
