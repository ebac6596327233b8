//! Catalog seeding command.
//!
//! Reads a YAML list of products and inserts them through the storefront's
//! product repository. Existing products (matched by name) are skipped, so
//! re-running the seeder is safe.

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use heartwood_storefront::db::{self, ProductRepository, RepositoryError};

use super::{CommandError, database_url};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A product entry in the seed file.
#[derive(Debug, Deserialize)]
struct SeedProduct {
    name: String,
    description: String,
    category: String,
    price: Decimal,
    image_url: Option<String>,
    count_in_stock: i32,
}

/// Seed the product catalog from a YAML file.
///
/// # Errors
///
/// Returns an error if the file is unreadable, the YAML is malformed, or
/// the database is unreachable. A name conflict on a single product is
/// logged and skipped rather than aborting the run.
pub async fn run(file: &Path) -> Result<(), SeedError> {
    let raw = std::fs::read_to_string(file).map_err(|source| SeedError::Read {
        path: file.display().to_string(),
        source,
    })?;
    let products: Vec<SeedProduct> = serde_yaml::from_str(&raw)?;

    let url = database_url()?;
    let pool = db::create_pool(&url).await.map_err(CommandError::from)?;
    let catalog = ProductRepository::new(pool);

    let mut inserted = 0usize;
    let mut skipped = 0usize;

    for product in products {
        let result = catalog
            .insert(
                &product.name,
                &product.description,
                &product.category,
                product.price,
                product.image_url.as_deref(),
                product.count_in_stock,
            )
            .await;

        match result {
            Ok(stored) => {
                tracing::info!(product = %stored.name, id = %stored.id, "seeded");
                inserted += 1;
            }
            Err(RepositoryError::Conflict(_)) => {
                tracing::info!(product = %product.name, "already present, skipping");
                skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!(inserted, skipped, "seeding complete");
    Ok(())
}
