//! Product catalog domain type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use heartwood_core::ProductId;

/// A catalog product.
///
/// The catalog is the authority for names and prices: orders snapshot these
/// values at placement time rather than trusting client-supplied figures.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub category: String,
    /// Price in major currency units.
    pub price: Decimal,
    pub image_url: Option<String>,
    pub count_in_stock: i32,
    pub created_at: DateTime<Utc>,
}
