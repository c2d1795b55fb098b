//! Error types for identity loading, signing and verification.

use edoc_core::{CanonicalizationError, DocumentError};
use thiserror::Error;

/// Low-level failure inside a signing backend.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The backend refused or failed to produce a signature.
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Failures loading a signing identity. Unrecoverable for the attempt.
#[derive(Error, Debug)]
pub enum IdentityError {
    /// The identity file does not exist or cannot be read.
    #[error("identity file {path} not readable: {reason}")]
    NotFound {
        /// Path that was tried.
        path: String,
        /// I/O error text.
        reason: String,
    },

    /// Decryption of the private key failed.
    #[error("wrong passphrase for encrypted private key")]
    BadPassphrase,

    /// A PEM block that does not decode.
    #[error("malformed PEM bundle: {0}")]
    MalformedPem(String),

    /// No usable private key in the bundle.
    #[error("malformed private key: {0}")]
    MalformedKey(String),

    /// No usable certificate in the bundle.
    #[error("malformed certificate: {0}")]
    MalformedCertificate(String),

    /// The leaf certificate's validity window ended.
    #[error("certificate expired at unix time {not_after}")]
    Expired {
        /// End of the validity window (seconds since epoch).
        not_after: u64,
    },

    /// The leaf certificate is not valid yet.
    #[error("certificate not valid before unix time {not_before}")]
    NotYetValid {
        /// Start of the validity window (seconds since epoch).
        not_before: u64,
    },

    /// RSA modulus shorter than the accepted minimum.
    #[error("RSA key of {bits} bits is below the 2048-bit minimum")]
    KeyTooSmall {
        /// Modulus size of the rejected key.
        bits: usize,
    },

    /// The private key does not correspond to the leaf certificate.
    #[error("private key does not match the leaf certificate")]
    KeyCertificateMismatch,

    /// A required environment variable is missing.
    #[error("environment variable {0} not set")]
    MissingEnv(String),
}

/// Failures producing an enveloped signature.
#[derive(Error, Debug)]
pub enum SignError {
    /// The document failed a structural precondition.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// The document could not be canonicalized.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// The signable root already carries a signature block.
    #[error("document {id} already carries a signature")]
    AlreadySigned {
        /// Identifier of the document.
        id: String,
    },

    /// The identity's backend failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Verification failures.
///
/// Any of these on a document this process signed is an internal
/// consistency error, never a condition to tolerate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// Digest recomputed over the root (minus signature) differs.
    #[error("digest mismatch: embedded {embedded}, computed {computed}")]
    DigestMismatch {
        /// Base64 digest carried in the signature.
        embedded: String,
        /// Base64 digest recomputed now.
        computed: String,
    },

    /// The signature value does not verify against the embedded certificate.
    #[error("signature value does not verify")]
    SignatureInvalid,

    /// The reference URI does not point at the root identifier.
    #[error("reference URI {found:?} does not match expected {expected:?}")]
    ReferenceMismatch {
        /// `#` + root identifier.
        expected: String,
        /// URI carried in the reference.
        found: String,
    },

    /// Transform list is not exactly one enveloped-signature transform.
    #[error("unsupported transform list: {0:?}")]
    UnsupportedTransforms(Vec<String>),

    /// The root has no signature block.
    #[error("no signature block under the signable root")]
    MissingSignature,

    /// The root has more than one signature block.
    #[error("{0} signature blocks under the signable root")]
    MultipleSignatures(usize),

    /// The signature block is not the root's last child.
    #[error("signature block is not the last child of the signable root")]
    SignatureNotLast,

    /// A required part of the signature is missing or undecodable.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// An algorithm URI other than the supported ones.
    #[error("unsupported algorithm {0}")]
    UnsupportedAlgorithm(String),

    /// The embedded certificate cannot be decoded or carries no RSA key.
    #[error("embedded certificate unusable: {0}")]
    Certificate(String),

    /// The root could not be canonicalized.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),
}
