//! # Verification Code (QR) Generation
//!
//! Derives the public verification URL printed on a document:
//!
//! ```text
//! base_url ? field_string & cHashQR = HEX(SHA-256(field_string || secret))
//! ```
//!
//! The field string is the fixed ordered field set concatenated with no
//! separators. The hash binds the fields to a secret shared with the remote
//! service; the secret itself never appears in the artifact, in `Debug` or
//! `Display` output, or in logs.
//!
//! ## Security Invariant
//!
//! [`Secret`] redacts itself in `Debug` and has no `Display`. Its raw value
//! is reachable only through [`Secret::expose`], which exists for hashing and
//! for registering the secret with response redactors. [`generate()`]
//! refuses to return an artifact that contains the secret verbatim.

use sha2::{Digest, Sha256};
use url::Url;
use zeroize::Zeroizing;

use edoc_crypto::SignedDocument;

use crate::error::QrError;

/// Query parameter carrying the hash.
pub const DEFAULT_HASH_PARAM: &str = "cHashQR";

// ─── Secret ──────────────────────────────────────────────────────────────

/// Shared secret for the verification hash. Zeroized on drop.
#[derive(Clone)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// The raw value, for hashing and for registering with redactors.
    /// Never log it.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// True if the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

// ─── Fields ──────────────────────────────────────────────────────────────

/// The fixed ordered field set, as already-formatted text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QrFields {
    /// Document identifier.
    pub identifier: String,
    /// Emission timestamp, second precision.
    pub emission_timestamp: String,
    /// Issuer tax identifier.
    pub issuer_id: String,
    /// Establishment and dispatch-point codes.
    pub location_codes: String,
    /// Document type code.
    pub document_type: String,
    /// Security/generation code.
    pub generation_code: String,
    /// Check digit.
    pub check_digit: String,
}

/// Where a field value comes from when extracting from a signed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    /// The signable root's identifier attribute.
    Identifier,
    /// Text of the first element with this local name outside the signature.
    Element(String),
    /// The signature's digest value (base64), binding the code to content.
    DigestValue,
    /// A fixed value (for example a secret identifier number).
    Literal(String),
}

/// Ordered field sources for [`OrderedFields::from_signed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelection {
    sources: Vec<FieldSource>,
}

impl FieldSelection {
    /// An explicit ordered selection.
    pub fn new(sources: Vec<FieldSource>) -> Self {
        Self { sources }
    }

    /// Select by element name. `Id` maps to the identifier attribute and
    /// `DigestValue` to the signature digest.
    pub fn by_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sources = names
            .into_iter()
            .map(|n| match n.as_ref() {
                "Id" => FieldSource::Identifier,
                "DigestValue" => FieldSource::DigestValue,
                other => FieldSource::Element(other.to_string()),
            })
            .collect();
        Self { sources }
    }

    /// The ordered sources.
    pub fn sources(&self) -> &[FieldSource] {
        &self.sources
    }
}

impl Default for FieldSelection {
    /// Identifier, emission timestamp, issuer, establishment, dispatch
    /// point, document type, security code, check digit.
    fn default() -> Self {
        Self::by_names([
            "Id", "dFeEmiDE", "dRucEm", "dEst", "dPunExp", "iTiDE", "dCodSeg", "dDVId",
        ])
    }
}

/// The field string fed to the hash and placed in the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedFields(String);

impl OrderedFields {
    /// Concatenate the fixed field set in order, no separators.
    pub fn new(fields: &QrFields) -> Self {
        Self(
            [
                fields.identifier.as_str(),
                fields.emission_timestamp.as_str(),
                fields.issuer_id.as_str(),
                fields.location_codes.as_str(),
                fields.document_type.as_str(),
                fields.generation_code.as_str(),
                fields.check_digit.as_str(),
            ]
            .concat(),
        )
    }

    /// Use an already formatted field string as-is.
    pub fn preformatted(fields: impl Into<String>) -> Self {
        Self(fields.into())
    }

    /// Extract the selected fields from a signed document.
    pub fn from_signed(
        signed: &SignedDocument,
        selection: &FieldSelection,
    ) -> Result<Self, QrError> {
        let mut out = String::new();
        for source in selection.sources() {
            match source {
                FieldSource::Identifier => out.push_str(signed.id()),
                FieldSource::Element(name) => {
                    let value = signed
                        .field(name)
                        .ok_or_else(|| QrError::MissingField(name.clone()))?;
                    out.push_str(&value);
                }
                FieldSource::DigestValue => out.push_str(&signed.digest().to_base64()),
                FieldSource::Literal(value) => out.push_str(value),
            }
        }
        Ok(Self(out))
    }

    /// The field string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ─── Artifact ────────────────────────────────────────────────────────────

/// A public verification URL. Contains no secret material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationArtifact {
    url: String,
    hash: String,
}

impl VerificationArtifact {
    /// The URL with a literal `&`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The uppercase hex hash.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// The URL with `&` escaped for embedding as markup text.
    pub fn escaped(&self) -> String {
        self.url.replace('&', "&amp;")
    }
}

impl std::fmt::Display for VerificationArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

/// Generate a verification artifact with the default hash parameter.
pub fn generate(
    fields: &OrderedFields,
    secret: &Secret,
    base_url: &Url,
) -> Result<VerificationArtifact, QrError> {
    generate_with_param(fields, secret, base_url, DEFAULT_HASH_PARAM)
}

/// Generate a verification artifact.
///
/// # Errors
///
/// - [`QrError::EmptySecret`] for an empty secret.
/// - [`QrError::EmptyFields`] for an empty field string.
/// - [`QrError::BaseHasQuery`] if `base_url` already carries a query.
/// - [`QrError::SecretExposed`] if the secret would appear in the URL.
pub fn generate_with_param(
    fields: &OrderedFields,
    secret: &Secret,
    base_url: &Url,
    hash_param: &str,
) -> Result<VerificationArtifact, QrError> {
    if secret.is_empty() {
        return Err(QrError::EmptySecret);
    }
    if fields.as_str().is_empty() {
        return Err(QrError::EmptyFields);
    }
    let base = match base_url.query() {
        None => base_url.as_str(),
        Some("") => base_url.as_str().trim_end_matches('?'),
        Some(_) => return Err(QrError::BaseHasQuery(base_url.to_string())),
    };

    let hash = verification_hash(fields, secret);
    let url = format!("{base}?{}&{hash_param}={hash}", fields.as_str());
    if url.contains(secret.expose()) {
        return Err(QrError::SecretExposed);
    }
    tracing::debug!(hash = %hash, "verification code generated");
    Ok(VerificationArtifact { url, hash })
}

fn verification_hash(fields: &OrderedFields, secret: &Secret) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fields.as_str().as_bytes());
    hasher.update(secret.expose().as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect()
}
