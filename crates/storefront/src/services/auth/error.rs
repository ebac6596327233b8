//! Authentication error types.

use heartwood_core::EmailError;

use crate::db::RepositoryError;

/// Errors from authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Email or password is wrong. Deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password does not meet requirements.
    #[error("{0}")]
    WeakPassword(String),

    /// Email address is malformed.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password hashing/verification machinery failed.
    #[error("password hashing error: {0}")]
    Hashing(String),

    /// Database failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
