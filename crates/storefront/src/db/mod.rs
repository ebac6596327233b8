//! Database operations for the storefront `PostgreSQL` instance.
//!
//! # Tables
//!
//! - `users` - Account identities and argon2 password hashes
//! - `products` - The furniture catalog (seeded via the CLI)
//! - `orders` / `order_items` - Order lifecycle records
//! - `session` - tower-sessions storage
//!
//! Queries are runtime-checked (`sqlx::query_as` with `FromRow` row types)
//! so the workspace compiles without a live database.
//!
//! # Migrations
//!
//! Migrations live in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p heartwood-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub mod orders;
pub mod products;
pub mod users;

pub use orders::{OrderRepository, OrderStore};
pub use products::{ProductCatalog, ProductRepository};
pub use users::UserRepository;

/// Errors from repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
