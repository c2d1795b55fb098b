//! # Envelope Assembly
//!
//! Wraps signed documents into transport units and units into an envelope:
//!
//! ```text
//! <rDE xmlns=NS>
//!   <dVerFor>150</dVerFor>
//!   …signed DE canonical bytes, verbatim…
//!   <gCamFuFD><dCarQR>URL</dCarQR></gCamFuFD>
//! </rDE>
//! ```
//!
//! Batch mode wraps one or more units in `<rLoteDE xmlns=NS>`, with no
//! identifier attribute.
//!
//! ## Invariant
//!
//! The signed root is never re-rendered. Its bytes are copied from
//! [`SignedDocument::canonical()`], so the signature block stays the last
//! child of the root exactly as signed. Only wrapper markup is rendered here.

use std::collections::BTreeSet;

use edoc_core::{escape_attribute, escape_text};
use edoc_crypto::SignedDocument;

use crate::error::EnvelopeError;
use crate::profile::EnvelopeProfile;
use crate::qr::VerificationArtifact;

/// Transport mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Exactly one document, sent inline.
    Single,
    /// One or more documents in a batch wrapper, sent zipped.
    Batch,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single => f.write_str("single"),
            Self::Batch => f.write_str("batch"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "batch" => Ok(Self::Batch),
            other => Err(format!("unknown mode '{other}', expected single or batch")),
        }
    }
}

/// A signed document and its verification artifact, ready to assemble.
#[derive(Debug, Clone)]
pub struct AssemblyItem {
    signed: SignedDocument,
    artifact: Option<VerificationArtifact>,
}

impl AssemblyItem {
    /// An item without a verification artifact.
    pub fn new(signed: SignedDocument) -> Self {
        Self {
            signed,
            artifact: None,
        }
    }

    /// Attach the verification artifact. It lands after the signable root,
    /// outside the signed subtree.
    pub fn with_artifact(mut self, artifact: VerificationArtifact) -> Self {
        self.artifact = Some(artifact);
        self
    }

    /// The signed document.
    pub fn signed(&self) -> &SignedDocument {
        &self.signed
    }

    /// The attached artifact, if any.
    pub fn artifact(&self) -> Option<&VerificationArtifact> {
        self.artifact.as_ref()
    }
}

/// Final transport bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    mode: Mode,
    bytes: Vec<u8>,
    ids: Vec<String>,
}

impl Envelope {
    /// Wrap bytes produced elsewhere (for validation or resubmission of a
    /// stored envelope). Document identifiers are not known.
    pub fn from_bytes(mode: Mode, bytes: Vec<u8>) -> Self {
        Self {
            mode,
            bytes,
            ids: Vec::new(),
        }
    }

    /// Transport mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The envelope bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume into the envelope bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Serialized size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True if there are no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Identifiers of the documents, in envelope order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

/// Assemble signed documents into an envelope.
///
/// # Errors
///
/// - [`EnvelopeError::SingleModeCount`] unless single mode gets one item.
/// - [`EnvelopeError::EmptyBatch`] / [`EnvelopeError::BatchTooLarge`] for
///   batch counts outside `1..=max_batch`.
/// - [`EnvelopeError::DuplicateIdentifier`] for repeated identifiers.
/// - [`EnvelopeError::NamespaceMismatch`] if a signed root does not declare
///   the envelope namespace itself.
pub fn assemble(
    items: Vec<AssemblyItem>,
    mode: Mode,
    profile: &EnvelopeProfile,
) -> Result<Envelope, EnvelopeError> {
    match mode {
        Mode::Single if items.len() != 1 => {
            return Err(EnvelopeError::SingleModeCount(items.len()));
        }
        Mode::Batch if items.is_empty() => return Err(EnvelopeError::EmptyBatch),
        Mode::Batch if items.len() > profile.max_batch => {
            return Err(EnvelopeError::BatchTooLarge {
                count: items.len(),
                max: profile.max_batch,
            });
        }
        _ => {}
    }

    let mut seen = BTreeSet::new();
    for item in &items {
        let id = item.signed.id();
        if !seen.insert(id.to_string()) {
            return Err(EnvelopeError::DuplicateIdentifier(id.to_string()));
        }
        let declared = item
            .signed
            .root()
            .namespaces()
            .get("")
            .map(String::as_str)
            .unwrap_or("");
        if declared != profile.namespace {
            return Err(EnvelopeError::NamespaceMismatch {
                id: id.to_string(),
                expected: profile.namespace.clone(),
                found: declared.to_string(),
            });
        }
    }

    let mut out = String::new();
    if mode == Mode::Batch {
        open_with_namespace(&mut out, &profile.batch_element, &profile.namespace);
    }
    for item in &items {
        render_unit(&mut out, item, profile);
    }
    if mode == Mode::Batch {
        close(&mut out, &profile.batch_element);
    }

    let ids: Vec<String> = items.iter().map(|i| i.signed.id().to_string()).collect();
    tracing::debug!(
        mode = %mode,
        documents = ids.len(),
        bytes = out.len(),
        "envelope assembled"
    );
    Ok(Envelope {
        mode,
        bytes: out.into_bytes(),
        ids,
    })
}

fn render_unit(out: &mut String, item: &AssemblyItem, profile: &EnvelopeProfile) {
    open_with_namespace(out, &profile.unit_element, &profile.namespace);
    leaf(out, &profile.version_element, &profile.format_version);
    out.push_str(item.signed.canonical().as_str());
    if let Some(artifact) = &item.artifact {
        open(out, &profile.artifact_group);
        leaf(out, &profile.artifact_element, artifact.url());
        close(out, &profile.artifact_group);
    }
    close(out, &profile.unit_element);
}

fn open_with_namespace(out: &mut String, name: &str, namespace: &str) {
    out.push('<');
    out.push_str(name);
    out.push_str(" xmlns=\"");
    out.push_str(&escape_attribute(namespace));
    out.push_str("\">");
}

fn open(out: &mut String, name: &str) {
    out.push('<');
    out.push_str(name);
    out.push('>');
}

fn close(out: &mut String, name: &str) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn leaf(out: &mut String, name: &str, text: &str) {
    open(out, name);
    out.push_str(&escape_text(text));
    close(out, name);
}
