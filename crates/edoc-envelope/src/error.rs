//! Error types for verification codes, assembly and packaging.

use thiserror::Error;

/// Verification-code generation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QrError {
    /// The shared secret is empty.
    #[error("verification secret is empty")]
    EmptySecret,

    /// The secret would appear verbatim in the generated artifact.
    #[error("verification secret would appear in the artifact")]
    SecretExposed,

    /// The base URL already carries a query string.
    #[error("base URL {0} already has a query string")]
    BaseHasQuery(String),

    /// The field string is empty.
    #[error("verification field string is empty")]
    EmptyFields,

    /// A selected field is absent from the signed document.
    #[error("field {0} not found in signed document")]
    MissingField(String),
}

/// Envelope assembly and packaging failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Batch mode with no documents.
    #[error("batch envelope needs at least one document")]
    EmptyBatch,

    /// Single mode with other than exactly one document.
    #[error("single envelope needs exactly one document, got {0}")]
    SingleModeCount(usize),

    /// More documents than the batch ceiling.
    #[error("batch of {count} documents exceeds the limit of {max}")]
    BatchTooLarge {
        /// Documents supplied.
        count: usize,
        /// Ceiling from the profile.
        max: usize,
    },

    /// Two documents share an identifier.
    #[error("duplicate document identifier {0}")]
    DuplicateIdentifier(String),

    /// The signed root's default namespace differs from the envelope's, so
    /// its signature would not verify once embedded.
    #[error("document {id} declares namespace {found:?}, envelope requires {expected:?}")]
    NamespaceMismatch {
        /// Document identifier.
        id: String,
        /// Profile namespace.
        expected: String,
        /// Namespace declared on the signed root (empty if none).
        found: String,
    },

    /// Zip packaging or unpacking failed.
    #[error("packaging failed: {0}")]
    Packaging(String),
}

impl From<zip::result::ZipError> for EnvelopeError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Packaging(err.to_string())
    }
}

impl From<std::io::Error> for EnvelopeError {
    fn from(err: std::io::Error) -> Self {
        Self::Packaging(err.to_string())
    }
}
