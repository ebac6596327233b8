//! Stripe hosted-checkout client.
//!
//! Uses the form-encoded Stripe REST API via `reqwest`. Only the checkout
//! session endpoints are needed: create, retrieve, and expire.

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;

use crate::config::StripeConfig;

use super::types::{CheckoutSession, CreateSessionRequest};
use super::{PaymentError, PaymentGateway};

/// Client for the Stripe checkout sessions API.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

/// Stripe error envelope: `{"error": {"message": ..., "type": ...}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl StripeClient {
    /// Create a new Stripe client.
    #[must_use]
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            inner: Arc::new(StripeClientInner {
                client: reqwest::Client::new(),
                api_base: config.api_base.trim_end_matches('/').to_owned(),
                secret_key: config.secret_key.expose_secret().to_owned(),
            }),
        }
    }

    fn sessions_url(&self, suffix: &str) -> String {
        format!("{}/v1/checkout/sessions{suffix}", self.inner.api_base)
    }

    async fn request(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<CheckoutSession, PaymentError> {
        let response = builder
            .bearer_auth(&self.inner.secret_key)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(PaymentError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body).map_or_else(
                |_| body.chars().take(200).collect::<String>(),
                |env| {
                    let kind = env.error.kind.unwrap_or_default();
                    let msg = env.error.message.unwrap_or_default();
                    format!("{kind}: {msg}")
                },
            );
            tracing::error!(status = %status, message = %message, "Stripe API error");
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| PaymentError::InvalidResponse(format!("bad session payload: {e}")))
    }
}

/// Build the form-encoded parameter list for session creation.
///
/// Stripe's nested-form convention: `line_items[0][price_data][currency]`.
fn session_form(request: &CreateSessionRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("mode".to_owned(), "payment".to_owned()),
        ("payment_method_types[0]".to_owned(), "card".to_owned()),
        ("success_url".to_owned(), request.success_url.clone()),
        ("cancel_url".to_owned(), request.cancel_url.clone()),
        (
            "customer_email".to_owned(),
            request.customer_email.as_str().to_owned(),
        ),
        (
            "metadata[user_id]".to_owned(),
            request.user_id.to_string(),
        ),
    ];

    for (i, item) in request.line_items.iter().enumerate() {
        params.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
        params.push((
            format!("line_items[{i}][price_data][currency]"),
            request.currency.as_gateway_str().to_owned(),
        ));
        params.push((
            format!("line_items[{i}][price_data][unit_amount]"),
            item.unit_amount.to_string(),
        ));
        params.push((
            format!("line_items[{i}][price_data][product_data][name]"),
            item.name.clone(),
        ));
        if let Some(image) = &item.image_url {
            params.push((
                format!("line_items[{i}][price_data][product_data][images][0]"),
                image.clone(),
            ));
        }
    }

    params
}

#[async_trait::async_trait]
impl PaymentGateway for StripeClient {
    #[instrument(skip(self, request), fields(lines = request.line_items.len()))]
    async fn create_checkout_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let params = session_form(&request);

        self.request(
            self.inner
                .client
                .post(self.sessions_url(""))
                .form(&params),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError> {
        self.request(
            self.inner
                .client
                .get(self.sessions_url(&format!("/{session_id}"))),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn expire_session(&self, session_id: &str) -> Result<(), PaymentError> {
        self.request(
            self.inner
                .client
                .post(self.sessions_url(&format!("/{session_id}/expire"))),
        )
        .await
        .map(|_| ())
    }
}
