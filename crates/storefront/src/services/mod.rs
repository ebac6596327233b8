//! Business services for the storefront.

pub mod auth;
pub mod orders;

pub use auth::{AuthError, AuthService};
pub use orders::{OrderError, OrderService};
