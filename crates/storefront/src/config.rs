//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `SANITY_PROJECT_ID` - Sanity project ID (lowercase letters and digits)
//! - `SANITY_WRITE_TOKEN` - Sanity API token with create permission on orders
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `SANITY_DATASET` - Dataset name (default: production)
//! - `SANITY_API_VERSION` - API version date (default: 2024-01-01)
//! - `SANITY_USE_CDN` - Read through the API CDN (default: true)
//! - `CART_IDLE_DAYS` - Days an untouched cart is kept (default: 7)
//! - `CART_MAX_ENTRIES` - Maximum number of carts held in memory (default: 10000)
//! - `ORDER_SUBMIT_TIMEOUT_SECS` - Order submission deadline (default: 15)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0 to 1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Trace sample rate, 0.0 to 1.0 (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Sanity content backend configuration
    pub sanity: SanityConfig,
    /// Cart retention limits
    pub cart: CartConfig,
    /// How long checkout waits for the order backend
    pub order_submit_timeout: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Sanity API configuration.
///
/// Implements `Debug` manually to redact the write token.
#[derive(Clone)]
pub struct SanityConfig {
    pub project_id: String,
    pub dataset: String,
    /// API version date (e.g., 2024-01-01)
    pub api_version: String,
    /// Read through `apicdn.sanity.io` instead of `api.sanity.io`
    pub use_cdn: bool,
    /// Token used for order mutations (server-side only)
    pub write_token: SecretString,
}

impl std::fmt::Debug for SanityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SanityConfig")
            .field("project_id", &self.project_id)
            .field("dataset", &self.dataset)
            .field("api_version", &self.api_version)
            .field("use_cdn", &self.use_cdn)
            .field("write_token", &"[REDACTED]")
            .finish()
    }
}

/// Limits for the in-memory cart store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartConfig {
    /// Carts untouched for this long are dropped
    pub idle_ttl: Duration,
    /// Upper bound on carts held at once
    pub max_entries: u64,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(7 * SECONDS_PER_DAY),
            max_entries: 10_000,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;

        let sanity = SanityConfig::from_env()?;
        let cart = CartConfig::from_env()?;
        let order_submit_timeout = Duration::from_secs(parse_env_or_default::<u64>(
            "ORDER_SUBMIT_TIMEOUT_SECS",
            "15",
        )?);

        Ok(Self {
            host,
            port,
            base_url,
            sanity,
            cart,
            order_submit_timeout,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_sample_rate("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_sample_rate("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SanityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let project_id = get_required_env("SANITY_PROJECT_ID")?;
        validate_project_id(&project_id)?;

        Ok(Self {
            project_id,
            dataset: get_env_or_default("SANITY_DATASET", "production"),
            api_version: get_env_or_default("SANITY_API_VERSION", "2024-01-01"),
            use_cdn: parse_env_or_default::<bool>("SANITY_USE_CDN", "true")?,
            write_token: get_validated_secret("SANITY_WRITE_TOKEN")?,
        })
    }
}

impl CartConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let idle_days = parse_env_or_default::<u64>("CART_IDLE_DAYS", "7")?;
        if idle_days == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CART_IDLE_DAYS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            idle_ttl: Duration::from_secs(idle_days.saturating_mul(SECONDS_PER_DAY)),
            max_entries: parse_env_or_default::<u64>("CART_MAX_ENTRIES", "10000")?,
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

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_sample_rate(key: &str, default: &str) -> Result<f32, ConfigError> {
    let rate = parse_env_or_default::<f32>(key, default)?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ))
    }
}

/// Project IDs end up in the API hostname.
fn validate_project_id(project_id: &str) -> Result<(), ConfigError> {
    let valid = !project_id.is_empty()
        && project_id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            "SANITY_PROJECT_ID".to_string(),
            "must contain only lowercase letters, digits and '-'".to_string(),
        ))
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the token generated in the Sanity dashboard."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sanity() -> SanityConfig {
        SanityConfig {
            project_id: "abc123xy".to_string(),
            dataset: "production".to_string(),
            api_version: "2024-01-01".to_string(),
            use_cdn: true,
            write_token: SecretString::from("sk_live_token_value"),
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-sanity-token", "SANITY_WRITE_TOKEN");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("skQ3v9LmT2xB7nR4pZ8wK1yH6cJ0dF5g", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_project_id() {
        assert!(validate_project_id("abc123xy").is_ok());
        assert!(validate_project_id("my-store").is_ok());
        assert!(validate_project_id("").is_err());
        assert!(validate_project_id("evil.com/").is_err());
        assert!(validate_project_id("UPPER").is_err());
    }

    #[test]
    fn test_cart_config_default() {
        let config = CartConfig::default();
        assert_eq!(config.idle_ttl, Duration::from_secs(604_800));
        assert_eq!(config.max_entries, 10_000);
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            sanity: sanity(),
            cart: CartConfig::default(),
            order_submit_timeout: Duration::from_secs(15),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_sanity_config_debug_redacts_token() {
        let debug_output = format!("{:?}", sanity());

        assert!(debug_output.contains("abc123xy"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk_live_token_value"));
    }
}
