//! Client configuration.
//!
//! # Environment Variables
//!
//! - `PROSHOP_API_URL` - Storefront base URL (required)
//! - `PROSHOP_SESSION_COOKIE` - Session cookie issued at login, sent with every request
//! - `PAYMENT_SCRIPT_MAX_ATTEMPTS` - Payment script load attempts before giving up (default: 3)
//! - `SHIPPING_FREE_THRESHOLD` / `SHIPPING_FLAT_RATE` - Shipping rule for cart estimates

use std::str::FromStr;

use proshop_core::ShippingPolicy;
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Default number of payment script load attempts.
pub const DEFAULT_MAX_SCRIPT_LOAD_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client session configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Storefront base URL, always ending in `/`
    pub base_url: Url,
    /// Session cookie (`name=value`) identifying the logged-in customer
    pub session_cookie: Option<SecretString>,
    /// Payment script load attempts before `UpstreamUnavailable` is final
    pub max_script_load_attempts: u32,
    /// Shipping rule for client-side estimates; the server's rule is authoritative
    pub shipping: ShippingPolicy,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the base URL.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url: with_trailing_slash(base_url),
            session_cookie: None,
            max_script_load_attempts: DEFAULT_MAX_SCRIPT_LOAD_ATTEMPTS,
            shipping: ShippingPolicy::default(),
        }
    }

    /// Attach the session cookie obtained at login.
    #[must_use]
    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(SecretString::from(cookie.into()));
        self
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `PROSHOP_API_URL` is missing or any value
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let raw_url = std::env::var("PROSHOP_API_URL")
            .map_err(|_| ConfigError::MissingEnvVar("PROSHOP_API_URL".to_string()))?;
        let base_url = Url::parse(&raw_url).map_err(|e| {
            ConfigError::InvalidEnvVar("PROSHOP_API_URL".to_string(), e.to_string())
        })?;

        let mut config = Self::new(base_url);
        config.session_cookie = std::env::var("PROSHOP_SESSION_COOKIE")
            .ok()
            .filter(|cookie| !cookie.is_empty())
            .map(SecretString::from);
        config.max_script_load_attempts = parse_env(
            "PAYMENT_SCRIPT_MAX_ATTEMPTS",
            DEFAULT_MAX_SCRIPT_LOAD_ATTEMPTS,
        )?;
        let defaults = ShippingPolicy::default();
        config.shipping = ShippingPolicy {
            free_shipping_threshold: parse_env(
                "SHIPPING_FREE_THRESHOLD",
                defaults.free_shipping_threshold,
            )?,
            flat_rate: parse_env("SHIPPING_FLAT_RATE", defaults.flat_rate)?,
        };
        if config.shipping.free_shipping_threshold < Decimal::ZERO
            || config.shipping.flat_rate < Decimal::ZERO
        {
            return Err(ConfigError::InvalidEnvVar(
                "SHIPPING_*".to_string(),
                "shipping amounts must not be negative".to_string(),
            ));
        }

        Ok(config)
    }
}

/// `Url::join` replaces the last segment unless the base ends in `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
