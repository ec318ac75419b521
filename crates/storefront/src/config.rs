//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STORE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STORE_TOKEN_SECRET` - Bearer token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `STORE_HOST` - Bind address (default: 127.0.0.1)
//! - `STORE_PORT` - Listen port (default: 5000)
//! - `STORE_TOKEN_TTL_SECS` - Bearer token lifetime in seconds (default: 3600)
//! - `STORE_CORS_ORIGINS` - Comma-separated allowed origins (default: any)
//! - `STORE_ENFORCE_STATUS_TRANSITIONS` - Only allow lifecycle status moves (default: false)
//! - `STORE_LOG_JSON` - Emit JSON logs (default: false)
//! - `STORE_TRUST_PROXY` - Key rate limits on `X-Forwarded-For`/`X-Real-IP` (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0-1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0-1.0 (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

/// Signing secrets shorter than this are refused.
const MIN_TOKEN_SECRET_LENGTH: usize = 32;

/// Below this many bits per character a secret looks hand-typed.
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Fragments that show up in copied `.env.example` values.
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
pub struct StoreConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// Bearer token settings
    pub auth: AuthConfig,
    /// Allowed CORS origins; empty means any origin
    pub cors_origins: Vec<String>,
    /// Reject order status changes that skip or reverse the lifecycle
    pub enforce_status_transitions: bool,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Client IP comes from proxy headers; only set behind a proxy that overwrites them
    pub trust_proxy: bool,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions sent to Sentry
    pub sentry_traces_sample_rate: f32,
}

/// Token signing configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC key for bearer tokens
    pub token_secret: SecretString,
    /// How long an issued token stays valid
    pub token_ttl: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl StoreConfig {
    /// Load configuration from the process environment and `.env`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing, a value does
    /// not parse, or the token secret is weak.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = ["STORE_DATABASE_URL", "DATABASE_URL"]
            .into_iter()
            .find_map(optional)
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("STORE_DATABASE_URL".to_owned()))?;

        Ok(Self {
            database_url,
            host: parsed("STORE_HOST", "127.0.0.1")?,
            port: parsed("STORE_PORT", "5000")?,
            auth: AuthConfig::from_env()?,
            cors_origins: optional("STORE_CORS_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_default(),
            enforce_status_transitions: flag("STORE_ENFORCE_STATUS_TRANSITIONS")?,
            log_json: flag("STORE_LOG_JSON")?,
            trust_proxy: flag("STORE_TRUST_PROXY")?,
            sentry_dsn: optional("SENTRY_DSN"),
            sentry_environment: optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parsed("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parsed("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Address the server binds to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl AuthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        const KEY: &str = "STORE_TOKEN_SECRET";

        let secret = optional(KEY).ok_or_else(|| ConfigError::MissingEnvVar(KEY.to_owned()))?;
        check_token_secret(&secret)
            .map_err(|reason| ConfigError::InsecureSecret(KEY.to_owned(), reason))?;

        let ttl_secs: u64 = parsed("STORE_TOKEN_TTL_SECS", &DEFAULT_TOKEN_TTL_SECS.to_string())?;
        if ttl_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STORE_TOKEN_TTL_SECS".to_owned(),
                "must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            token_secret: SecretString::from(secret),
            token_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

// =============================================================================
// Environment Readers
// =============================================================================

/// A set, non-blank variable.
fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse `key`, or `default` when it is unset.
fn parsed<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional(key)
        .as_deref()
        .unwrap_or(default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string()))
}

/// A boolean switch. Unset means `false`.
fn flag(key: &str) -> Result<bool, ConfigError> {
    let Some(raw) = optional(key) else {
        return Ok(false);
    };
    parse_bool(raw.trim())
        .ok_or_else(|| ConfigError::InvalidEnvVar(key.to_owned(), format!("not a boolean: {raw}")))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_owned)
        .collect()
}

// =============================================================================
// Secret Checks
// =============================================================================

/// Reject a signing secret that is short, a placeholder, or low entropy.
///
/// The `Err` carries a reason suitable for an operator.
fn check_token_secret(secret: &str) -> Result<(), String> {
    let length = secret.chars().count();
    if length < MIN_TOKEN_SECRET_LENGTH {
        return Err(format!(
            "must be at least {MIN_TOKEN_SECRET_LENGTH} characters (got {length})"
        ));
    }

    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(format!("appears to be a placeholder (contains '{pattern}')"));
    }

    let entropy = bits_per_char(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(format!(
            "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}); generate it randomly"
        ));
    }

    Ok(())
}

/// Shannon entropy of `s` in bits per character.
#[allow(clippy::cast_precision_loss)]
fn bits_per_char(s: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    let mut total = 0_u32;
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = f64::from(total);
    counts
        .into_values()
        .map(|count| {
            let p = f64::from(count) / total;
            -p * p.log2()
        })
        .sum()
}
