//! Product catalog route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use heartwood_core::ProductId;

use crate::db::ProductCatalog;
use crate::error::{AppError, Result};
use crate::models::Product;
use crate::state::AppState;

/// List the full catalog, newest first.
///
/// GET /products
///
/// # Errors
///
/// Returns 500 if the database query fails.
#[instrument(skip_all)]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = state.catalog().list().await?;
    Ok(Json(products))
}

/// Fetch a single product.
///
/// GET /products/{id}
///
/// # Errors
///
/// Returns 404 if the product does not exist.
#[instrument(skip_all, fields(product = %id))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = state
        .catalog()
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    Ok(Json(product))
}
