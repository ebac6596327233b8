//! Domain models for the storefront.
//!
//! These types represent validated domain objects separate from database
//! row types and request/response payloads.

pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use order::{NewOrder, Order, OrderItem, ShippingAddress};
pub use product::Product;
pub use session::{CurrentUser, session_keys};
pub use user::User;
