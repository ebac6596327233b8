//! Payment gateway collaborator.
//!
//! The storefront delegates all payment processing to a hosted checkout
//! service. [`PaymentGateway`] is the seam: the production implementation is
//! [`StripeClient`]; tests substitute an in-memory double.
//!
//! Two trust rules apply everywhere this module is used:
//! - amounts cross this boundary as integer minor units, rounded half-up;
//! - payment confirmation comes from [`PaymentGateway::retrieve_session`],
//!   never from client-visible redirect parameters.

mod stripe;
pub mod types;

pub use stripe::StripeClient;
pub use types::{
    CheckoutLineItem, CheckoutSession, CreateSessionRequest, SessionPaymentStatus, SessionState,
};

use async_trait::async_trait;

/// Errors from the payment gateway.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// Transport-level failure reaching the gateway.
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway rejected the request.
    #[error("gateway rejected request ({status}): {message}")]
    Api {
        /// HTTP status returned by the gateway.
        status: u16,
        /// Error message from the gateway response body.
        message: String,
    },

    /// Rate limited; retry after the given number of seconds.
    #[error("gateway rate limited, retry after {0}s")]
    RateLimited(u64),

    /// The gateway response could not be interpreted.
    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),
}

/// Hosted-checkout payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session and return it with its redirect URL.
    async fn create_checkout_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Fetch the current state of a checkout session.
    ///
    /// This is the authority for payment confirmation.
    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError>;

    /// Expire an open session so it can no longer be paid.
    ///
    /// Used as the compensating action when order persistence fails after
    /// session creation.
    async fn expire_session(&self, session_id: &str) -> Result<(), PaymentError>;
}
