//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`. Responses are JSON `{"message": ...}` with an
//! appropriate status and no internal detail leakage.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::payments::PaymentError;
use crate::services::auth::AuthError;
use crate::services::orders::OrderError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Order lifecycle operation failed.
    #[error("order error: {0}")]
    Order(#[from] OrderError),

    /// Authentication operation failed.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] RepositoryError),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

/// Whether an error class is server-side and worth a Sentry event.
fn is_server_error(err: &AppError) -> bool {
    match err {
        AppError::Database(_) | AppError::Internal(_) => true,
        AppError::Order(order) => matches!(
            order,
            OrderError::Gateway(_) | OrderError::Repository(_)
        ),
        AppError::Auth(auth) => matches!(
            auth,
            AuthError::Repository(_) | AuthError::Hashing(_)
        ),
        AppError::NotFound(_) | AppError::BadRequest(_) => false,
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Order(order) => match order {
                OrderError::Validation(_) => StatusCode::BAD_REQUEST,
                OrderError::NotFound => StatusCode::NOT_FOUND,
                OrderError::NotAuthorized => StatusCode::FORBIDDEN,
                OrderError::PaymentIncomplete => StatusCode::PAYMENT_REQUIRED,
                OrderError::SessionExpired => StatusCode::GONE,
                OrderError::Gateway(PaymentError::RateLimited(_)) => {
                    StatusCode::TOO_MANY_REQUESTS
                }
                OrderError::Gateway(_) => StatusCode::BAD_GATEWAY,
                OrderError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
                OrderError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(auth) => match auth {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => {
                    StatusCode::BAD_REQUEST
                }
                AuthError::Hashing(_) | AuthError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Database(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Client-facing message. Server-side failures are masked.
    fn message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "internal server error".to_owned(),
            Self::Order(order) => match order {
                OrderError::Gateway(PaymentError::RateLimited(_)) => {
                    "payment gateway is busy, try again shortly".to_owned()
                }
                OrderError::Gateway(_) => "payment gateway error".to_owned(),
                OrderError::Repository(_) => "internal server error".to_owned(),
                other => other.to_string(),
            },
            Self::Auth(auth) => match auth {
                AuthError::Hashing(_) | AuthError::Repository(_) => {
                    "internal server error".to_owned()
                }
                other => other.to_string(),
            },
            Self::NotFound(what) => format!("{what} not found"),
            Self::BadRequest(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if is_server_error(&self) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = ErrorBody {
            message: self.message(),
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {err}"))
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_order_error_status_codes() {
        assert_eq!(
            status_of(OrderError::Validation("bad".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(OrderError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(OrderError::NotAuthorized.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(OrderError::PaymentIncomplete.into()),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status_of(OrderError::SessionExpired.into()),
            StatusCode::GONE
        );
    }

    #[test]
    fn test_server_errors_are_masked() {
        let err = AppError::Internal("pool exhausted: secret-host:5432".into());
        assert_eq!(err.message(), "internal server error");
    }

    #[test]
    fn test_validation_messages_are_passed_through() {
        let err: AppError = OrderError::Validation("no order items".into()).into();
        assert_eq!(err.message(), "no order items");
    }
}
