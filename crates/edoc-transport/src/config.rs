//! Transport configuration.
//!
//! Configures the endpoint for each environment plus timeouts and the
//! transport-class retry count. Defaults point to the remote service's
//! published hosts. Override via environment variables or explicit
//! construction for staging/testing.

use std::time::Duration;

use url::Url;

use crate::request::Environment;

/// Default endpoint for the test environment.
pub const DEFAULT_TEST_URL: &str = "https://sifen-test.set.gov.py";
/// Default endpoint for the production environment.
pub const DEFAULT_PRODUCTION_URL: &str = "https://sifen.set.gov.py";

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base URL for [`Environment::Test`].
    pub test_url: Url,
    /// Base URL for [`Environment::Production`].
    pub production_url: Url,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub read_timeout_secs: u64,
    /// Retries after the first attempt, for transport-class failures only.
    pub retries: u32,
    /// First backoff delay; doubles on each retry.
    pub base_delay_ms: u64,
}

impl TransportConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `EDOC_TEST_URL` (default: [`DEFAULT_TEST_URL`])
    /// - `EDOC_PRODUCTION_URL` (default: [`DEFAULT_PRODUCTION_URL`])
    /// - `EDOC_CONNECT_TIMEOUT_SECS` (default: 10)
    /// - `EDOC_READ_TIMEOUT_SECS` (default: 60)
    /// - `EDOC_TRANSPORT_RETRIES` (default: 3)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            test_url: env_url("EDOC_TEST_URL", DEFAULT_TEST_URL)?,
            production_url: env_url("EDOC_PRODUCTION_URL", DEFAULT_PRODUCTION_URL)?,
            connect_timeout_secs: env_number("EDOC_CONNECT_TIMEOUT_SECS", 10),
            read_timeout_secs: env_number("EDOC_READ_TIMEOUT_SECS", 60),
            retries: env_number("EDOC_TRANSPORT_RETRIES", 3),
            base_delay_ms: 200,
        })
    }

    /// Create a configuration pointing both environments at one local mock
    /// server (for testing). Short timeouts, no retries.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if `base` cannot be parsed.
    pub fn local_mock(base: &str) -> Result<Self, ConfigError> {
        let url =
            Url::parse(base).map_err(|e| ConfigError::InvalidUrl("mock".to_string(), e.to_string()))?;
        Ok(Self {
            test_url: url.clone(),
            production_url: url,
            connect_timeout_secs: 2,
            read_timeout_secs: 5,
            retries: 0,
            base_delay_ms: 10,
        })
    }

    /// Base URL for an environment.
    pub fn endpoint(&self, environment: Environment) -> &Url {
        match environment {
            Environment::Test => &self.test_url,
            Environment::Production => &self.production_url,
        }
    }

    /// Connection timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Whole-request timeout.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_number<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}
