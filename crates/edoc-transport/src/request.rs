//! Submission requests and raw responses.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Remote operation a payload is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// One envelope sent inline.
    ReceiveDocument,
    /// A zipped batch envelope.
    ReceiveBatch,
}

impl OperationKind {
    /// Path of the operation below the environment's base URL.
    pub fn path(self) -> &'static str {
        match self {
            Self::ReceiveDocument => "de/ws/sync/recibe.wsdl",
            Self::ReceiveBatch => "de/ws/async/recibe-lote.wsdl",
        }
    }

    /// Name used in logs and user-visible messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReceiveDocument => "receive_document",
            Self::ReceiveBatch => "receive_batch",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Test,
    Production,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Production => "production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing an [`Environment`] name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown environment {0:?}, expected \"test\" or \"production\"")]
pub struct UnknownEnvironment(pub String);

impl std::str::FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            other => Err(UnknownEnvironment(other.to_string())),
        }
    }
}

/// Payload and routing for one transport call.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Envelope bytes (single) or zip package bytes (batch).
    pub payload: Vec<u8>,
    pub operation: OperationKind,
    pub environment: Environment,
    /// Correlation id for logs.
    pub request_id: Uuid,
}

impl SubmitRequest {
    /// A request with a fresh correlation id.
    pub fn new(payload: Vec<u8>, operation: OperationKind, environment: Environment) -> Self {
        Self {
            payload,
            operation,
            environment,
            request_id: Uuid::new_v4(),
        }
    }

    /// Numeric request identifier carried in the SOAP body (at most 15
    /// decimal digits).
    pub fn numeric_id(&self) -> u64 {
        (self.request_id.as_u128() % 1_000_000_000_000_000) as u64
    }
}

/// An HTTP response as received, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
