//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional:
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (default: http://localhost:3000)
//! - `STOREFRONT_API_BASE_URL` - Products backend base URL (default: http://localhost:8080/api)
//! - `STOREFRONT_API_TIMEOUT_SECS` - Backend request timeout (default: 10)
//! - `STOREFRONT_CART_STORE` - Cart key-value file, or `memory` (default: data/carts.json)
//! - `STOREFRONT_STATIC_DIR` - Static asset directory (default: crates/storefront/static)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_CART_STORE: &str = "data/carts.json";
const IN_MEMORY_CART_STORE: &str = "memory";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
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
    /// Products backend configuration
    pub api: CatalogApiConfig,
    /// Where carts are persisted
    pub cart_store: CartStoreLocation,
    /// Static asset directory served under `/static`
    pub static_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Products backend configuration.
#[derive(Debug, Clone)]
pub struct CatalogApiConfig {
    /// Base URL including the `/api` path, without trailing slash
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Persistence target for the cart key-value store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartStoreLocation {
    /// JSON file on disk.
    File(PathBuf),
    /// Process memory only; carts are lost on restart.
    Memory,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_env_or_default("STOREFRONT_BASE_URL", "http://localhost:3000");

        let api = CatalogApiConfig::from_env()?;
        let cart_store =
            CartStoreLocation::parse(&get_env_or_default("STOREFRONT_CART_STORE", DEFAULT_CART_STORE));
        let static_dir = PathBuf::from(get_env_or_default(
            "STOREFRONT_STATIC_DIR",
            "crates/storefront/static",
        ));

        Ok(Self {
            host,
            port,
            base_url,
            api,
            cart_store,
            static_dir,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration suitable for tests: in-memory carts, given backend.
    #[must_use]
    pub fn for_backend(api_base_url: Url) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            base_url: "http://localhost".to_string(),
            api: CatalogApiConfig {
                base_url: api_base_url,
                timeout: Duration::from_secs(5),
            },
            cart_store: CartStoreLocation::Memory,
            static_dir: PathBuf::from("crates/storefront/static"),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl CatalogApiConfig {
    /// Load only the backend settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL or timeout is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = parse_api_base_url(&get_env_or_default(
            "STOREFRONT_API_BASE_URL",
            DEFAULT_API_BASE_URL,
        ))
        .map_err(|reason| ConfigError::InvalidEnvVar("STOREFRONT_API_BASE_URL".to_string(), reason))?;

        let timeout_secs = get_env_or_default("STOREFRONT_API_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_API_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl CartStoreLocation {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case(IN_MEMORY_CART_STORE) {
            Self::Memory
        } else {
            Self::File(PathBuf::from(value))
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse and validate the backend base URL.
///
/// Must be an absolute http(s) URL; a trailing slash is dropped so paths can
/// be appended with `format!`.
pub fn parse_api_base_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim_end_matches('/')).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_base_url_strips_trailing_slash() {
        let url = parse_api_base_url("http://localhost:8080/api/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api");
    }

    #[test]
    fn test_parse_api_base_url_rejects_other_schemes() {
        assert!(parse_api_base_url("ftp://example.com/api").is_err());
        assert!(parse_api_base_url("not a url").is_err());
    }

    #[test]
    fn test_cart_store_location() {
        assert_eq!(CartStoreLocation::parse("memory"), CartStoreLocation::Memory);
        assert_eq!(CartStoreLocation::parse("MEMORY"), CartStoreLocation::Memory);
        assert_eq!(
            CartStoreLocation::parse("data/carts.json"),
            CartStoreLocation::File(PathBuf::from("data/carts.json"))
        );
    }

    #[test]
    fn test_socket_addr() {
        let mut config =
            StorefrontConfig::for_backend(Url::parse("http://localhost:8080/api").unwrap());
        config.port = 3000;

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_is_secure() {
        let mut config =
            StorefrontConfig::for_backend(Url::parse("http://localhost:8080/api").unwrap());
        assert!(!config.is_secure());
        config.base_url = "https://shop.example.com".to_string();
        assert!(config.is_secure());
    }
}
