//! Verification-code configuration.
//!
//! Holds the public base URL and the shared secret. Custom `Debug` redacts
//! the secret to prevent leakage into logs.

use url::Url;

use crate::qr::{FieldSource, Secret};

/// Shortest secret accepted from the environment, in characters.
pub const MIN_SECRET_LEN: usize = 16;

/// Default public verification endpoint.
pub const DEFAULT_QR_BASE_URL: &str = "https://ekuatia.set.gov.py/consultas-test/qr";

/// Configuration for verification-code generation.
#[derive(Clone)]
pub struct VerificationConfig {
    /// Base URL the field string is appended to.
    pub base_url: Url,
    /// Shared secret for the hash.
    pub secret: Secret,
    /// Identifier of the secret registered with the remote service, if any.
    pub secret_id: Option<String>,
}

impl std::fmt::Debug for VerificationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationConfig")
            .field("base_url", &self.base_url)
            .field("secret", &"[REDACTED]")
            .field("secret_id", &self.secret_id)
            .finish()
    }
}

impl VerificationConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `EDOC_QR_BASE_URL` (default: [`DEFAULT_QR_BASE_URL`])
    /// - `EDOC_QR_SECRET` (required, at least [`MIN_SECRET_LEN`] characters)
    /// - `EDOC_QR_SECRET_ID` (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// As [`from_env`](Self::from_env), reading variables through `get`.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let secret = get("EDOC_QR_SECRET").ok_or(ConfigError::MissingSecret)?;
        let length = secret.chars().count();
        if length < MIN_SECRET_LEN {
            return Err(ConfigError::ShortSecret {
                length,
                min: MIN_SECRET_LEN,
            });
        }
        let raw = get("EDOC_QR_BASE_URL").unwrap_or_else(|| DEFAULT_QR_BASE_URL.to_string());
        let base_url = Url::parse(&raw)
            .map_err(|e| ConfigError::InvalidUrl("EDOC_QR_BASE_URL".to_string(), e.to_string()))?;
        Ok(Self {
            base_url,
            secret: Secret::new(secret),
            secret_id: get("EDOC_QR_SECRET_ID"),
        })
    }

    /// Build a configuration explicitly.
    pub fn new(base_url: Url, secret: Secret) -> Self {
        Self {
            base_url,
            secret,
            secret_id: None,
        }
    }

    /// The secret identifier as a trailing literal field, when configured.
    pub fn secret_id_field(&self) -> Option<FieldSource> {
        self.secret_id
            .as_ref()
            .map(|id| FieldSource::Literal(id.clone()))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("EDOC_QR_SECRET environment variable is required")]
    MissingSecret,
    #[error("EDOC_QR_SECRET has {length} characters, at least {min} required")]
    ShortSecret { length: usize, min: usize },
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}
