//! User domain types.

use chrono::{DateTime, Utc};

use heartwood_core::{Email, UserId};

/// A storefront user (domain type).
///
/// The password hash never leaves the repository layer; this type carries
/// only what handlers need.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Whether the user holds the administrative capability.
    pub is_admin: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}
