//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (decides secure cookies)
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string, falling back to
//!   `DATABASE_URL` (only when the storage backend is `postgres`)
//!
//! ## Optional
//! - `STOREFRONT_STORAGE` - `postgres` (default) or `memory`
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_GATE_THRESHOLD` - Anonymous interactions before the
//!   verification nudge (default: 2)
//! - `STOREFRONT_ANONYMOUS_ITEM_LIMIT` - Catalog items shown to anonymous
//!   visitors (default: 2)
//! - `STOREFRONT_OTP_TTL_SECS` - One-time passcode lifetime (default: 600)
//! - `STOREFRONT_IDENTITY_SCOPE` - `global` (default) or `per_store` email
//!   uniqueness
//! - `STOREFRONT_RATE_LIMIT` - Rate limit the OTP endpoints (default: true)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use scanlane_core::UniquenessScope;
use scanlane_core::engagement::GATE_THRESHOLD;

use crate::services::catalog::ANONYMOUS_ITEM_LIMIT;
use crate::services::otp::DEFAULT_TTL;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where durable state lives.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// `PostgreSQL` at the given URL (contains password).
    Postgres { database_url: SecretString },
    /// Process memory, seeded with demo data. Lost on restart.
    Memory,
}

/// Tuning for the engagement funnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngagementConfig {
    /// Interactions before an anonymous session is nudged to verify
    pub gate_threshold: u32,
    /// Catalog items revealed to anonymous visitors
    pub anonymous_item_limit: usize,
    /// Lifetime of a one-time passcode
    pub otp_ttl: Duration,
    /// Reach of customer email uniqueness
    pub identity_scope: UniquenessScope,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            gate_threshold: GATE_THRESHOLD,
            anonymous_item_limit: ANONYMOUS_ITEM_LIMIT,
            otp_ttl: DEFAULT_TTL,
            identity_scope: UniquenessScope::Global,
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Storage backend
    pub storage: StorageConfig,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Engagement funnel tuning
    pub engagement: EngagementConfig,
    /// Whether the OTP endpoints are rate limited
    pub rate_limit: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
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

        let storage = match get_env_or_default("STOREFRONT_STORAGE", "postgres").as_str() {
            "postgres" => StorageConfig::Postgres {
                database_url: get_database_url("STOREFRONT_DATABASE_URL")?,
            },
            "memory" => StorageConfig::Memory,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "STOREFRONT_STORAGE".to_string(),
                    format!("expected 'postgres' or 'memory', got '{other}'"),
                ));
            }
        };

        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;

        let engagement = EngagementConfig {
            gate_threshold: parse_env("STOREFRONT_GATE_THRESHOLD", &GATE_THRESHOLD.to_string())?,
            anonymous_item_limit: parse_env(
                "STOREFRONT_ANONYMOUS_ITEM_LIMIT",
                &ANONYMOUS_ITEM_LIMIT.to_string(),
            )?,
            otp_ttl: Duration::from_secs(parse_env(
                "STOREFRONT_OTP_TTL_SECS",
                &DEFAULT_TTL.as_secs().to_string(),
            )?),
            identity_scope: parse_env("STOREFRONT_IDENTITY_SCOPE", "global")?,
        };
        if engagement.otp_ttl.is_zero() {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_OTP_TTL_SECS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }

        let rate_limit = parse_bool(
            "STOREFRONT_RATE_LIMIT",
            &get_env_or_default("STOREFRONT_RATE_LIMIT", "true"),
        )?;

        Ok(Self {
            storage,
            host,
            port,
            base_url,
            engagement,
            rate_limit,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Session cookies are `Secure` when the storefront is served over HTTPS.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}
