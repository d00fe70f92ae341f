//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SAFFRON_API_BASE_URL` - Base URL of the Saffron commerce backend
//! - `SAFFRON_STRIPE_PUBLISHABLE_KEY` - Stripe publishable key (`pk_...`)
//!
//! ## Optional
//! - `SAFFRON_STRIPE_API_BASE` - Stripe API base URL
//!   (default: `https://api.stripe.com`)
//! - `SAFFRON_STATE_DIR` - Directory for persisted client state such as the
//!   session file (default: `.saffron`)

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Commerce backend configuration.
    pub backend: BackendConfig,
    /// Stripe payment gateway configuration.
    pub stripe: StripeConfig,
    /// Directory for persisted client state (session file).
    pub state_dir: PathBuf,
}

/// Commerce backend API configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the backend, without a trailing path
    /// (e.g., `http://localhost:8000`).
    pub base_url: Url,
}

/// Stripe payment gateway configuration.
///
/// Only the publishable key belongs in a storefront client; the secret key
/// stays on the backend. Loading rejects anything that is not a `pk_` key so
/// a misplaced secret key fails at startup instead of going over the wire.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Stripe publishable key (`pk_live_...` / `pk_test_...`).
    pub publishable_key: String,
    /// Stripe API base URL. Overridable for tests.
    pub api_base: Url,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from a `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let backend = BackendConfig {
            base_url: get_url("SAFFRON_API_BASE_URL")?,
        };
        let stripe = StripeConfig {
            publishable_key: get_publishable_key("SAFFRON_STRIPE_PUBLISHABLE_KEY")?,
            api_base: get_url_or_default("SAFFRON_STRIPE_API_BASE", "https://api.stripe.com")?,
        };
        let state_dir = PathBuf::from(get_env_or_default("SAFFRON_STATE_DIR", ".saffron"));

        Ok(Self {
            backend,
            stripe,
            state_dir,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a required environment variable parsed as a URL.
fn get_url(key: &str) -> Result<Url, ConfigError> {
    let value = get_required_env(key)?;
    parse_url(key, &value)
}

/// Get an optional environment variable parsed as a URL, with a default.
fn get_url_or_default(key: &str, default: &str) -> Result<Url, ConfigError> {
    let value = get_env_or_default(key, default);
    parse_url(key, &value)
}

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Load a Stripe publishable key, rejecting non-publishable material.
fn get_publishable_key(key: &str) -> Result<String, ConfigError> {
    let value = get_required_env(key)?;
    validate_publishable_key(&value, key)?;
    Ok(value)
}

fn validate_publishable_key(value: &str, var_name: &str) -> Result<(), ConfigError> {
    if value.starts_with("sk_") || value.starts_with("rk_") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "looks like a Stripe secret key; the storefront only accepts a publishable key (pk_...)"
                .to_string(),
        ));
    }
    if !value.starts_with("pk_") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "expected a Stripe publishable key (pk_...)".to_string(),
        ));
    }
    Ok(())
}
