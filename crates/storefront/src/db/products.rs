//! Product catalog repository.
//!
//! The catalog is read-only from the storefront's point of view; writes
//! happen through the CLI seeder.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use heartwood_core::ProductId;

use super::RepositoryError;
use crate::models::product::Product;

/// Catalog port used by the order service to snapshot prices.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Fetch a product by ID.
    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// List the full catalog, newest first.
    async fn list(&self) -> Result<Vec<Product>, RepositoryError>;
}

/// Postgres-backed product repository.
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

#[derive(FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: String,
    category: String,
    price: Decimal,
    image_url: Option<String>,
    count_in_stock: i32,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            category: row.category,
            price: row.price,
            image_url: row.image_url,
            count_in_stock: row.count_in_stock,
            created_at: row.created_at,
        }
    }
}

const SELECT_PRODUCT: &str = "SELECT id, name, description, category, price, image_url, \
     count_in_stock, created_at FROM products";

impl ProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a product (used by the CLI seeder).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a product with the same name
    /// already exists.
    pub async fn insert(
        &self,
        name: &str,
        description: &str,
        category: &str,
        price: Decimal,
        image_url: Option<&str>,
        count_in_stock: i32,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "INSERT INTO products (id, name, description, category, price, image_url, count_in_stock) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, name, description, category, price, image_url, count_in_stock, created_at",
        )
        .bind(ProductId::generate().as_uuid())
        .bind(name)
        .bind(description)
        .bind(category)
        .bind(price)
        .bind(image_url)
        .bind(count_in_stock)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(format!("product '{name}' already exists"));
            }
            RepositoryError::Database(e)
        })?;

        Ok(row.into())
    }
}

#[async_trait]
impl ProductCatalog for ProductRepository {
    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{SELECT_PRODUCT} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows =
            sqlx::query_as::<_, ProductRow>(&format!("{SELECT_PRODUCT} ORDER BY created_at DESC"))
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }
}
