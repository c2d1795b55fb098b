//! Transport and decoding error types.

/// Errors from the transport collaborator.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection failure, reset, or other transport-level error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The request exceeded its timeout.
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    ClientInit(String),
    /// The endpoint URL for an operation could not be formed.
    #[error("invalid endpoint {base} for {path}: {reason}")]
    Endpoint {
        base: String,
        path: String,
        reason: String,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

impl TransportError {
    /// Connection/timeout class. These are the errors the retry policy
    /// handles and the controller maps to its transport-error outcome.
    pub fn is_transport_class(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Timeout { .. })
    }

    pub(crate) fn from_reqwest(endpoint: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else {
            Self::Http {
                endpoint: endpoint.to_string(),
                source,
            }
        }
    }
}

/// Errors decoding a response body into a response code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The body is not well-formed markup.
    #[error("response body (HTTP {status}) is not well-formed: {reason}")]
    Unparseable { status: u16, reason: String },
    /// The body has no response-code element.
    #[error("response (HTTP {status}) has no <{element}> element")]
    MissingCode { status: u16, element: String },
    /// The response-code element is empty.
    #[error("response (HTTP {status}) has an empty <{element}> element")]
    EmptyCode { status: u16, element: String },
}
