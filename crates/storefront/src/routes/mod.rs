//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (verifies database)
//!
//! # Products
//! GET  /products                - Product listing
//! GET  /products/{id}           - Product detail
//!
//! # Orders (require auth)
//! POST /orders                  - Place order, open checkout session
//! GET  /orders/myorders         - Current user's order history
//! GET  /orders/{id}             - Order detail (owner or admin)
//! PUT  /orders/verify-payment   - Confirm payment via gateway session
//! PUT  /orders/{id}/pay         - Mark paid without a session (admin)
//!
//! # Auth
//! POST /auth/register           - Create account, start session
//! POST /auth/login              - Start session
//! POST /auth/logout             - Destroy session
//! GET  /auth/me                 - Current session profile
//! ```

pub mod auth;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::create))
        .route("/myorders", get(orders::my_orders))
        .route("/verify-payment", put(orders::verify_payment))
        .route("/{id}", get(orders::show))
        .route("/{id}/pay", put(orders::mark_paid))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/products", product_routes())
        .nest("/orders", order_routes())
        .nest("/auth", auth_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
