//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `QKART_API_ENDPOINT` - Base URL of the backend API (e.g. `https://qkart.example.com/api/v1`)
//!
//! ## Optional
//! - `QKART_STATE_PATH` - Local state file (default: `.qkart/state.json`)
//! - `QKART_SEARCH_DEBOUNCE_MS` - Search quiescence window (default: 500)
//! - `QKART_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `QKART_CATALOG_CACHE_TTL_SECS` - Catalog/search cache lifetime (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_STATE_PATH: &str = ".qkart/state.json";
const DEFAULT_SEARCH_DEBOUNCE_MS: &str = "500";
const DEFAULT_HTTP_TIMEOUT_SECS: &str = "10";
const DEFAULT_CATALOG_CACHE_TTL_SECS: &str = "300";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// QKart client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend API
    pub api_endpoint: Url,
    /// Where the session (token, username, wallet, cart) is persisted
    pub state_path: PathBuf,
    /// Quiescence window before a search request is sent
    pub search_debounce: Duration,
    /// Timeout applied to every HTTP request
    pub http_timeout: Duration,
    /// Lifetime of cached catalog and search responses
    pub catalog_cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let source = Source(get);

        let raw_endpoint = source.required("QKART_API_ENDPOINT")?;
        let api_endpoint = parse_endpoint(&raw_endpoint)
            .map_err(|e| ConfigError::InvalidEnvVar("QKART_API_ENDPOINT".to_string(), e))?;

        let state_path = PathBuf::from(source.or_default("QKART_STATE_PATH", DEFAULT_STATE_PATH));
        let search_debounce = Duration::from_millis(source.parse_u64(
            "QKART_SEARCH_DEBOUNCE_MS",
            DEFAULT_SEARCH_DEBOUNCE_MS,
        )?);
        let http_timeout = Duration::from_secs(
            source.parse_u64("QKART_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
        );
        let catalog_cache_ttl = Duration::from_secs(source.parse_u64(
            "QKART_CATALOG_CACHE_TTL_SECS",
            DEFAULT_CATALOG_CACHE_TTL_SECS,
        )?);

        Ok(Self {
            api_endpoint,
            state_path,
            search_debounce,
            http_timeout,
            catalog_cache_ttl,
            sentry_dsn: source.optional("SENTRY_DSN"),
            sentry_environment: source.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration pointing at `endpoint` with every other value defaulted.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `endpoint` is not an HTTP(S) URL.
    pub fn for_endpoint(endpoint: &str) -> Result<Self, ConfigError> {
        Self::from_source(|key| (key == "QKART_API_ENDPOINT").then(|| endpoint.to_string()))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Source<F>(F);

impl<F: Fn(&str) -> Option<String>> Source<F> {
    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        (self.0)(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Get a variable as `u64`, with a default value.
    fn parse_u64(&self, key: &str, default: &str) -> Result<u64, ConfigError> {
        self.or_default(key, default)
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}

/// Parse the API base URL. Only `http` and `https` are accepted.
fn parse_endpoint(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme '{other}'")),
    }
    if url.cannot_be_a_base() {
        return Err("URL cannot be used as a base".to_string());
    }
    Ok(url)
}
