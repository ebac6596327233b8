//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions.

use secrecy::ExposeSecret;
use sqlx::PgPool;
use tower_sessions::cookie::Key;
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "hw_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with `PostgreSQL` store and signed cookies.
///
/// The session table is created via migration, not at startup. Config
/// validation guarantees the secret is at least 64 bytes, the minimum
/// [`Key::from`] accepts.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore, SignedCookie> {
    let store = PostgresStore::new(pool.clone());

    let signing_key = Key::from(config.session_secret.expose_secret().as_bytes());

    // Secure cookies whenever the public client is served over HTTPS
    let is_secure = config.frontend_url.starts_with("https://");

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(signing_key)
}

#[cfg(test)]
mod tests {
    use heartwood_core::CurrencyCode;
    use rust_decimal::Decimal;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;

    use super::*;
    use crate::config::StripeConfig;

    fn test_config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 5000,
            frontend_url: "https://shop.example".to_string(),
            session_secret: SecretString::from("x".repeat(64)),
            stripe: StripeConfig {
                secret_key: SecretString::from("sk_test_abc"),
                api_base: "https://api.stripe.com".to_string(),
            },
            currency: CurrencyCode::Inr,
            shipping_flat_rate: Decimal::from(50),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        }
    }

    #[tokio::test]
    async fn session_layer_signs_cookies_with_the_configured_secret() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/test")
            .unwrap();

        // Builds the signing key from the validated secret; the return type
        // pins the layer to signed cookies.
        let _layer: SessionManagerLayer<PostgresStore, SignedCookie> =
            create_session_layer(&pool, &test_config());
    }
}
