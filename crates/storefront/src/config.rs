//! Shop configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOP_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `SHOP_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy;
//!   falls back to `SECRET_KEY`)
//!
//! ## Optional
//! - `SHOP_HOST` - Bind address (default: 127.0.0.1)
//! - `SHOP_PORT` - Listen port (default: 3000)
//! - `SHOP_BASE_URL` - Public URL (default: <http://localhost:3000>)
//! - `SHOP_STATIC_DIR` - Static asset directory (default: crates/storefront/static)
//! - `SHOP_IMAGES_DIR` - Product image directory (default: `<static>/images`)
//! - `SHOP_RATE_LIMIT_AUTH` - Rate limit login/register (default: true)
//! - `ADMIN_EMAIL`, `ADMIN_USERNAME`, `ADMIN_PASSWORD` - Bootstrap admin account
//! - `STRIPE_PUBLIC_KEY`, `STRIPE_SECRET_KEY` - Payment keys (loaded, not charged against)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_STATIC_DIR: &str = "crates/storefront/static";
const DEFAULT_ADMIN_USERNAME: &str = "admin";

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

/// Shop application configuration.
#[derive(Debug, Clone)]
pub struct ShopConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the shop
    pub base_url: Url,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Directory uploaded product images are written to
    pub images_dir: PathBuf,
    /// Whether login and registration are rate limited
    pub rate_limit_auth: bool,
    /// Admin account created on startup, if configured
    pub admin: Option<AdminBootstrap>,
    /// Payment provider keys
    pub payment: PaymentConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Credentials for the admin account ensured at startup.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub username: String,
    pub password: SecretString,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Payment provider keys.
///
/// Loaded so deployments can configure them; no workflow charges cards yet.
/// Implements `Debug` manually to redact the secret key.
#[derive(Clone, Default)]
pub struct PaymentConfig {
    /// Publishable key (safe to expose in browser)
    pub public_key: Option<String>,
    /// Secret key (server-side only)
    pub secret_key: Option<SecretString>,
}

impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("public_key", &self.public_key)
            .field(
                "secret_key",
                &self.secret_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl PaymentConfig {
    /// Whether both keys are present.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.public_key.is_some() && self.secret_key.is_some()
    }
}

impl ShopConfig {
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

        let database_url = get_with_fallback("SHOP_DATABASE_URL", "DATABASE_URL")
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("SHOP_DATABASE_URL".to_string()))?;
        let host = get_env_or_default("SHOP_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SHOP_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("SHOP_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SHOP_PORT".to_string(), e.to_string()))?;
        let base_url = Url::parse(&get_env_or_default("SHOP_BASE_URL", "http://localhost:3000"))
            .map_err(|e| ConfigError::InvalidEnvVar("SHOP_BASE_URL".to_string(), e.to_string()))?;

        let session_secret = get_with_fallback("SHOP_SESSION_SECRET", "SECRET_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("SHOP_SESSION_SECRET".to_string()))?;
        validate_secret_strength(&session_secret, "SHOP_SESSION_SECRET")?;
        let session_secret = SecretString::from(session_secret);
        validate_session_secret(&session_secret, "SHOP_SESSION_SECRET")?;

        let static_dir = PathBuf::from(get_env_or_default("SHOP_STATIC_DIR", DEFAULT_STATIC_DIR));
        let images_dir = get_optional_env("SHOP_IMAGES_DIR")
            .map_or_else(|| static_dir.join("images"), PathBuf::from);
        let rate_limit_auth = parse_bool("SHOP_RATE_LIMIT_AUTH", true)?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            static_dir,
            images_dir,
            rate_limit_auth,
            admin: AdminBootstrap::from_env(),
            payment: PaymentConfig::from_env(),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.scheme() == "https"
    }
}

impl AdminBootstrap {
    /// Present only when both `ADMIN_EMAIL` and `ADMIN_PASSWORD` are set.
    fn from_env() -> Option<Self> {
        let email = get_optional_env("ADMIN_EMAIL")?;
        let password = get_optional_env("ADMIN_PASSWORD")?;
        Some(Self {
            email,
            username: get_env_or_default("ADMIN_USERNAME", DEFAULT_ADMIN_USERNAME),
            password: SecretString::from(password),
        })
    }
}

impl PaymentConfig {
    fn from_env() -> Self {
        Self {
            public_key: get_optional_env("STRIPE_PUBLIC_KEY"),
            secret_key: get_optional_env("STRIPE_SECRET_KEY").map(SecretString::from),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get the primary variable, falling back to a generic one (e.g. `DATABASE_URL`
/// set by a hosting provider's postgres attach).
fn get_with_fallback(primary_key: &str, fallback_key: &str) -> Option<String> {
    get_optional_env(primary_key).or_else(|| get_optional_env(fallback_key))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_bool(key: &str, default: bool) -> Result<bool, ConfigError> {
    match get_optional_env(key) {
        None => Ok(default),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("expected a boolean, got '{other}'"),
            )),
        },
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
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
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_config() -> ShopConfig {
        ShopConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: Url::parse("http://localhost:3000").unwrap(),
            session_secret: SecretString::from("x".repeat(32)),
            static_dir: PathBuf::from("static"),
            images_dir: PathBuf::from("static/images"),
            rate_limit_auth: true,
            admin: None,
            payment: PaymentConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
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
        let err = validate_secret_strength("your-session-key-here", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"a".repeat(40), "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_length() {
        assert!(validate_session_secret(&SecretString::from("short"), "S").is_err());
        assert!(validate_session_secret(&SecretString::from("a".repeat(32)), "S").is_ok());
    }

    #[test]
    fn test_socket_addr_and_secure_flag() {
        let mut config = sample_config();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert!(!config.is_secure());

        config.base_url = Url::parse("https://shop.example.org").unwrap();
        assert!(config.is_secure());
    }

    #[test]
    fn test_payment_config_debug_redacts_secret() {
        let payment = PaymentConfig {
            public_key: Some("pk_test_visible".to_string()),
            secret_key: Some(SecretString::from("sk_test_hidden_value")),
        };
        let debug_output = format!("{payment:?}");
        assert!(debug_output.contains("pk_test_visible"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk_test_hidden_value"));
        assert!(payment.is_configured());
    }

    #[test]
    fn test_admin_bootstrap_debug_redacts_password() {
        let admin = AdminBootstrap {
            email: "admin@shop.test".to_string(),
            username: "admin".to_string(),
            password: SecretString::from("hunter2hunter2"),
        };
        let debug_output = format!("{admin:?}");
        assert!(debug_output.contains("admin@shop.test"));
        assert!(!debug_output.contains("hunter2"));
    }
}
