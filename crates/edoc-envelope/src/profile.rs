//! Envelope and validation profiles.
//!
//! The element names, namespace and limits of the remote service live here
//! rather than in the assembler, so a second remote profile is a value, not
//! a fork.

use serde::{Deserialize, Serialize};

/// Namespace of the default remote profile.
pub const DEFAULT_NAMESPACE: &str = "http://ekuatia.set.gov.py/sifen/xsd";

/// Format version marker value of the default remote profile.
pub const DEFAULT_FORMAT_VERSION: &str = "150";

/// Names and limits used to assemble an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeProfile {
    /// Default namespace of the envelope and the signable root.
    pub namespace: String,
    /// Value of the format-version marker.
    pub format_version: String,
    /// Transport unit element (one per document).
    pub unit_element: String,
    /// Format-version marker element, first child of each unit.
    pub version_element: String,
    /// Signable root element.
    pub root_element: String,
    /// Group holding the verification artifact.
    pub artifact_group: String,
    /// Element holding the verification URL.
    pub artifact_element: String,
    /// Batch wrapper element.
    pub batch_element: String,
    /// Maximum documents per batch.
    pub max_batch: usize,
}

impl Default for EnvelopeProfile {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            format_version: DEFAULT_FORMAT_VERSION.to_string(),
            unit_element: "rDE".to_string(),
            version_element: "dVerFor".to_string(),
            root_element: "DE".to_string(),
            artifact_group: "gCamFuFD".to_string(),
            artifact_element: "dCarQR".to_string(),
            batch_element: "rLoteDE".to_string(),
            max_batch: 50,
        }
    }
}

/// Limits enforced by the structural validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationProfile {
    /// Envelope names the validator expects.
    pub envelope: EnvelopeProfile,
    /// Size ceiling for a single-document envelope, in bytes.
    pub single_limit_bytes: usize,
    /// Size ceiling for a batch envelope, in bytes.
    pub batch_limit_bytes: usize,
    /// Fractional-second digits tolerated in timestamp text.
    pub max_fraction_digits: usize,
}

impl Default for ValidationProfile {
    fn default() -> Self {
        Self {
            envelope: EnvelopeProfile::default(),
            single_limit_bytes: 1000 * 1024,
            batch_limit_bytes: 10 * 1024 * 1024,
            max_fraction_digits: 0,
        }
    }
}

impl ValidationProfile {
    /// The size ceiling for a mode.
    pub fn limit_for(&self, mode: crate::Mode) -> usize {
        match mode {
            crate::Mode::Single => self.single_limit_bytes,
            crate::Mode::Batch => self.batch_limit_bytes,
        }
    }
}
