//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ATELIER_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `ATELIER_API_TOKEN` - Bearer token for administrative routes (min 32 chars, high entropy)
//! - `STRIPE_SECRET_KEY` - Stripe secret API key
//!
//! ## Optional
//! - `ATELIER_HOST` - Bind address (default: 127.0.0.1)
//! - `ATELIER_PORT` - Listen port (default: 1337)
//! - `ATELIER_BASE_URL` - Public URL (default: `http://localhost:1337`)
//! - `ATELIER_CURRENCY` - Shop currency (default: usd)
//! - `STRIPE_WEBHOOK_SECRET` - Webhook signing secret (webhook disabled when unset)
//! - `STRIPE_API_BASE` - Stripe API base URL (default: `https://api.stripe.com`)
//! - `CORS_ORIGINS` - Comma-separated allowed origins (default: base URL)
//! - `CORS_MAX_AGE_SECS` - Preflight cache lifetime (default: 600)
//! - `COMPRESSION_MIN_BYTES` - Smallest body worth compressing (default: 1024)
//! - `RATE_LIMIT_REPLENISH_SECS` / `RATE_LIMIT_BURST` - General API limiter (default: 1 / 50)
//! - `PAYMENT_RATE_LIMIT_REPLENISH_SECS` / `PAYMENT_RATE_LIMIT_BURST` - Payment limiter (default: 6 / 5)
//! - `CACHE_TTL_SECS` / `CACHE_MAX_ENTRIES` - Artwork cache (default: 300 / 1000)
//! - `HSTS_MAX_AGE_SECS` - HSTS lifetime when served over https (default: 31536000)
//! - `STORAGE_HEALTH_URL` - Object storage URL probed by `/health/detailed`
//! - `HEALTH_CHECK_TIMEOUT_MS` - Timeout for outbound health probes (default: 2000)
//! - `ALERT_RESPONSE_TIME_MS` / `ALERT_ERROR_RATE_PERCENT` / `ALERT_CHANNELS` - Alerting thresholds
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use atelier_core::CurrencyCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;

const MIN_API_TOKEN_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
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

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Bearer token guarding administrative routes
    pub api_token: SecretString,
    /// Currency for new carts and orders
    pub currency: CurrencyCode,
    /// Stripe configuration
    pub stripe: StripeConfig,
    /// HTTP stack configuration (CORS, compression, rate limits, headers)
    pub http: HttpConfig,
    /// Artwork cache configuration
    pub cache: CacheConfig,
    /// Health probe configuration
    pub health: HealthConfig,
    /// Alert thresholds reported by `/health/detailed`
    pub alerting: AlertingConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry performance sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_live_...` / `sk_test_...`)
    pub secret_key: SecretString,
    /// Webhook endpoint signing secret (`whsec_...`)
    pub webhook_secret: Option<SecretString>,
    /// API base URL, overridable for stripe-mock
    pub api_base: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// HTTP middleware configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Allowed CORS origins
    pub cors_origins: Vec<String>,
    /// CORS preflight max age
    pub cors_max_age: Duration,
    /// Responses smaller than this are sent uncompressed
    pub compression_min_bytes: u16,
    /// General API: seconds per replenished token
    pub rate_limit_replenish_secs: u64,
    /// General API: burst size
    pub rate_limit_burst: u32,
    /// Payment routes: seconds per replenished token
    pub payment_rate_limit_replenish_secs: u64,
    /// Payment routes: burst size
    pub payment_rate_limit_burst: u32,
    /// HSTS max-age in seconds
    pub hsts_max_age_secs: u64,
}

/// Artwork cache configuration.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_entries: u64,
}

/// Health probe configuration.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Object storage endpoint to `HEAD`, if any
    pub storage_url: Option<String>,
    /// Timeout applied to outbound probes
    pub probe_timeout: Duration,
}

/// Alerting thresholds and channel names.
///
/// Nothing in the service delivers alerts; the values are reported so
/// external monitors can read them from one place.
#[derive(Debug, Clone, Serialize)]
pub struct AlertingConfig {
    pub response_time_ms: u64,
    pub error_rate_percent: f64,
    pub channels: Vec<String>,
}

impl ApiConfig {
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

        let database_url = get_database_url("ATELIER_DATABASE_URL")?;
        let host = parse_env_or_default::<IpAddr>("ATELIER_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("ATELIER_PORT", "1337")?;
        let base_url = parse_url_or_default("ATELIER_BASE_URL", "http://localhost:1337")?;
        let api_token = get_validated_secret("ATELIER_API_TOKEN")?;
        validate_token_length(&api_token, "ATELIER_API_TOKEN")?;
        let currency = parse_env_or_default::<CurrencyCode>("ATELIER_CURRENCY", "usd")?;

        let stripe = StripeConfig::from_env()?;
        let http = HttpConfig::from_env(&base_url)?;
        let cache = CacheConfig::from_env()?;
        let health = HealthConfig::from_env()?;
        let alerting = AlertingConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            api_token,
            currency,
            stripe,
            http,
            cache,
            health,
            alerting,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the public URL is served over TLS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
            webhook_secret: get_optional_env("STRIPE_WEBHOOK_SECRET").map(SecretString::from),
            api_base: parse_url_or_default("STRIPE_API_BASE", "https://api.stripe.com")?
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

impl HttpConfig {
    fn from_env(base_url: &str) -> Result<Self, ConfigError> {
        let cors_origins = get_optional_env("CORS_ORIGINS").map_or_else(
            || vec![base_url.trim_end_matches('/').to_string()],
            |raw| parse_list(&raw),
        );

        Ok(Self {
            cors_origins,
            cors_max_age: Duration::from_secs(parse_env_or_default("CORS_MAX_AGE_SECS", "600")?),
            compression_min_bytes: parse_env_or_default("COMPRESSION_MIN_BYTES", "1024")?,
            rate_limit_replenish_secs: parse_nonzero("RATE_LIMIT_REPLENISH_SECS", "1")?,
            rate_limit_burst: parse_nonzero("RATE_LIMIT_BURST", "50")?,
            payment_rate_limit_replenish_secs: parse_nonzero(
                "PAYMENT_RATE_LIMIT_REPLENISH_SECS",
                "6",
            )?,
            payment_rate_limit_burst: parse_nonzero("PAYMENT_RATE_LIMIT_BURST", "5")?,
            hsts_max_age_secs: parse_env_or_default("HSTS_MAX_AGE_SECS", "31536000")?,
        })
    }
}

impl CacheConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            ttl: Duration::from_secs(parse_env_or_default("CACHE_TTL_SECS", "300")?),
            max_entries: parse_env_or_default("CACHE_MAX_ENTRIES", "1000")?,
        })
    }
}

impl HealthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            storage_url: get_optional_env("STORAGE_HEALTH_URL")
                .map(|raw| validate_url("STORAGE_HEALTH_URL", raw))
                .transpose()?,
            probe_timeout: Duration::from_millis(parse_env_or_default(
                "HEALTH_CHECK_TIMEOUT_MS",
                "2000",
            )?),
        })
    }
}

impl AlertingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            response_time_ms: parse_env_or_default("ALERT_RESPONSE_TIME_MS", "1000")?,
            error_rate_percent: parse_env_or_default("ALERT_ERROR_RATE_PERCENT", "5")?,
            channels: parse_list(&get_env_or_default("ALERT_CHANNELS", "email")),
        })
    }
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            response_time_ms: 1000,
            error_rate_percent: 5.0,
            channels: vec!["email".to_string()],
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
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

/// Parse a numeric variable that must be greater than zero.
fn parse_nonzero<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let value = parse_env_or_default::<T>(key, default)?;
    if value == T::default() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(value)
}

/// Read an http(s) URL, falling back to `default` when unset.
fn parse_url_or_default(key: &str, default: &str) -> Result<String, ConfigError> {
    validate_url(key, get_env_or_default(key, default))
}

fn validate_url(key: &str, raw: String) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme {}", parsed.scheme()),
        ));
    }
    Ok(raw.trim().to_string())
}

/// Split a comma-separated list, dropping empty entries.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Validate that the API token meets minimum length requirements.
fn validate_token_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_API_TOKEN_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_API_TOKEN_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
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
    let len = s.chars().count() as f64;
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
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
pub(crate) mod tests {
    use super::*;

    /// Configuration used by unit tests across the crate.
    pub(crate) fn test_config() -> ApiConfig {
        ApiConfig {
            database_url: SecretString::from("postgres://localhost/atelier_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 1337,
            base_url: "http://localhost:1337".to_string(),
            api_token: SecretString::from("tK9#vQ2$mW7!pZ4@rX8%nB3^hJ6&cL1*"),
            currency: CurrencyCode::USD,
            stripe: StripeConfig {
                secret_key: SecretString::from("sk_test_4eC39HqLyjWDarjtT1zdp7dc"),
                webhook_secret: Some(SecretString::from("whsec_test_signing")),
                api_base: "http://127.0.0.1:12111".to_string(),
            },
            http: HttpConfig {
                cors_origins: vec!["http://localhost:3000".to_string()],
                cors_max_age: Duration::from_secs(600),
                compression_min_bytes: 1024,
                rate_limit_replenish_secs: 1,
                rate_limit_burst: 50,
                payment_rate_limit_replenish_secs: 6,
                payment_rate_limit_burst: 5,
                hsts_max_age_secs: 31_536_000,
            },
            cache: CacheConfig {
                ttl: Duration::from_secs(300),
                max_entries: 100,
            },
            health: HealthConfig {
                storage_url: None,
                probe_timeout: Duration::from_millis(500),
            },
            alerting: AlertingConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("sk_test_your-key-here", "STRIPE_SECRET_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"a".repeat(40), "ATELIER_API_TOKEN");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_accepts_stripe_style_key() {
        assert!(validate_secret_strength("sk_test_4eC39HqLyjWDarjtT1zdp7dc", "K").is_ok());
    }

    #[test]
    fn test_validate_token_length() {
        assert!(validate_token_length(&SecretString::from("short"), "T").is_err());
        assert!(validate_token_length(&SecretString::from("x".repeat(32)), "T").is_ok());
    }

    #[test]
    fn test_validate_url() {
        assert_eq!(
            validate_url("X", " https://shop.example.com ".to_string()).unwrap(),
            "https://shop.example.com"
        );
        assert!(validate_url("X", "ftp://files.example.com".to_string()).is_err());
        assert!(validate_url("X", "not a url".to_string()).is_err());
    }

    #[test]
    fn test_parse_list_trims_and_drops_empty() {
        assert_eq!(
            parse_list(" https://a.example/ , ,https://b.example"),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn test_socket_addr_and_secure_flag() {
        let mut config = test_config();
        assert_eq!(config.socket_addr().port(), 1337);
        assert!(!config.is_secure());

        config.base_url = "https://shop.atelier.example".to_string();
        assert!(config.is_secure());
    }

    #[test]
    fn test_stripe_config_debug_redacts_secrets() {
        let config = test_config();
        let debug_output = format!("{:?}", config.stripe);

        assert!(debug_output.contains("http://127.0.0.1:12111"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk_test_4eC39"));
        assert!(!debug_output.contains("whsec_test_signing"));
    }
}
