//! User management commands.

use thiserror::Error;

use heartwood_core::{Email, EmailError};
use heartwood_storefront::db::{self, RepositoryError, UserRepository};

use super::{CommandError, database_url};

/// Errors that can occur during user management.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("No user registered with email: {0}")]
    UserNotFound(String),

    #[error("Database error: {0}")]
    Repository(RepositoryError),
}

/// Promote an existing user to admin.
///
/// # Errors
///
/// Returns an error if the email is invalid, no account exists for it, or
/// the database is unreachable.
pub async fn promote(email: &str) -> Result<(), AdminError> {
    let email = Email::parse(email)?;

    let url = database_url()?;
    let pool = db::create_pool(&url).await.map_err(CommandError::from)?;
    let users = UserRepository::new(pool);

    match users.promote_to_admin(&email).await {
        Ok(()) => {
            tracing::info!(email = %email, "user promoted to admin");
            Ok(())
        }
        Err(RepositoryError::NotFound) => Err(AdminError::UserNotFound(email.to_string())),
        Err(e) => Err(AdminError::Repository(e)),
    }
}
