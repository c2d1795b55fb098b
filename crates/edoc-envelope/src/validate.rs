//! # Structural Validation
//!
//! Local pre-flight checks on assembled envelope bytes, mirroring the
//! structural rejections of the remote service. Every check runs
//! independently and all issues are reported, so a caller sees the full list
//! before anything is transmitted.
//!
//! The validator parses the bytes it is given rather than trusting the
//! assembler, so it also catches envelopes built or stored elsewhere.

use edoc_core::{fraction_digits, parse, Element};

use crate::assemble::{Envelope, Mode};
use crate::profile::ValidationProfile;

/// Local name of the signature block.
const SIGNATURE: &str = "Signature";

/// A structural problem found before transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralIssue {
    /// A signable root has no signature block.
    MissingSignature {
        /// Document identifier (or unit position).
        document: String,
    },
    /// A signable root has more than one signature block.
    MultipleSignatures {
        /// Document identifier.
        document: String,
        /// Number of blocks found.
        count: usize,
    },
    /// The signature block is not the last child of its signable root.
    SignatureNotLast {
        /// Document identifier.
        document: String,
    },
    /// A signature block sits somewhere other than directly under a
    /// signable root.
    SignatureOutsideRoot {
        /// Parent element of the stray block.
        parent: String,
    },
    /// A transport unit has no signable root.
    MissingSignableRoot {
        /// Unit position (1-based).
        unit: usize,
    },
    /// The batch wrapper carries an identifier attribute.
    BatchWrapperIdentifier,
    /// Timestamp text with more fractional-second digits than allowed.
    SubSecondTimestamp {
        /// Element holding the value.
        element: String,
        /// The offending text.
        value: String,
    },
    /// The verification URL lacks `?` before its parameter list.
    VerificationUrlSeparator {
        /// The URL as found.
        url: String,
    },
    /// Serialized size above the ceiling for the mode.
    SizeExceeded {
        /// Envelope size.
        size: usize,
        /// Ceiling for the mode.
        limit: usize,
        /// Mode the ceiling applies to.
        mode: Mode,
    },
    /// A unit does not start with the format-version marker.
    MissingFormatVersion {
        /// Unit position (1-based).
        unit: usize,
    },
    /// The format-version marker carries an unexpected value.
    FormatVersionMismatch {
        /// Unit position (1-based).
        unit: usize,
        /// Expected value.
        expected: String,
        /// Value found.
        found: String,
    },
    /// A namespace prefix on the envelope, signable root or signature.
    NamespacePrefix {
        /// Qualified element name.
        element: String,
    },
    /// The bytes are not well-formed markup.
    Unparseable {
        /// Parser message.
        reason: String,
    },
    /// The outermost element does not match the mode.
    UnexpectedRoot {
        /// Expected element name.
        expected: String,
        /// Element found.
        found: String,
    },
}

/// A mechanical fix applicable to the unsigned document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalCorrection {
    /// Truncate fractional seconds from the named element's text.
    TruncateTimestamp {
        /// Local name of the element to fix.
        element: String,
    },
}

impl StructuralIssue {
    /// The local correction for this issue, if one exists.
    pub fn correction(&self) -> Option<LocalCorrection> {
        match self {
            Self::SubSecondTimestamp { element, .. } => Some(LocalCorrection::TruncateTimestamp {
                element: element.clone(),
            }),
            _ => None,
        }
    }

    /// Short machine-readable kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingSignature { .. } => "missing_signature",
            Self::MultipleSignatures { .. } => "multiple_signatures",
            Self::SignatureNotLast { .. } => "signature_not_last",
            Self::SignatureOutsideRoot { .. } => "signature_outside_root",
            Self::MissingSignableRoot { .. } => "missing_signable_root",
            Self::BatchWrapperIdentifier => "batch_wrapper_identifier",
            Self::SubSecondTimestamp { .. } => "sub_second_timestamp",
            Self::VerificationUrlSeparator { .. } => "verification_url_separator",
            Self::SizeExceeded { .. } => "size_exceeded",
            Self::MissingFormatVersion { .. } => "missing_format_version",
            Self::FormatVersionMismatch { .. } => "format_version_mismatch",
            Self::NamespacePrefix { .. } => "namespace_prefix",
            Self::Unparseable { .. } => "unparseable",
            Self::UnexpectedRoot { .. } => "unexpected_root",
        }
    }
}

impl std::fmt::Display for StructuralIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSignature { document } => write!(f, "document {document} has no signature"),
            Self::MultipleSignatures { document, count } => {
                write!(f, "document {document} has {count} signatures")
            }
            Self::SignatureNotLast { document } => {
                write!(f, "signature of document {document} is not its last child")
            }
            Self::SignatureOutsideRoot { parent } => {
                write!(f, "signature found under <{parent}>, outside a signable root")
            }
            Self::MissingSignableRoot { unit } => write!(f, "unit {unit} has no signable root"),
            Self::BatchWrapperIdentifier => f.write_str("batch wrapper carries an identifier"),
            Self::SubSecondTimestamp { element, value } => {
                write!(f, "<{element}> has sub-second timestamp {value}")
            }
            Self::VerificationUrlSeparator { url } => {
                write!(f, "verification URL lacks '?' before parameters: {url}")
            }
            Self::SizeExceeded { size, limit, mode } => {
                write!(f, "{mode} envelope is {size} bytes, limit {limit}")
            }
            Self::MissingFormatVersion { unit } => {
                write!(f, "unit {unit} does not start with the format version")
            }
            Self::FormatVersionMismatch {
                unit,
                expected,
                found,
            } => write!(f, "unit {unit} format version {found}, expected {expected}"),
            Self::NamespacePrefix { element } => write!(f, "namespace prefix on <{element}>"),
            Self::Unparseable { reason } => write!(f, "envelope is not well-formed: {reason}"),
            Self::UnexpectedRoot { expected, found } => {
                write!(f, "envelope root <{found}>, expected <{expected}>")
            }
        }
    }
}

/// Validate envelope bytes against a profile, reporting every issue.
pub fn validate(envelope: &Envelope, profile: &ValidationProfile) -> Vec<StructuralIssue> {
    let mut issues = Vec::new();
    let names = &profile.envelope;

    let limit = profile.limit_for(envelope.mode());
    if envelope.len() > limit {
        issues.push(StructuralIssue::SizeExceeded {
            size: envelope.len(),
            limit,
            mode: envelope.mode(),
        });
    }

    let root = match parse(envelope.as_bytes()) {
        Ok(root) => root,
        Err(e) => {
            issues.push(StructuralIssue::Unparseable {
                reason: e.to_string(),
            });
            return issues;
        }
    };

    let expected_root = match envelope.mode() {
        Mode::Single => &names.unit_element,
        Mode::Batch => &names.batch_element,
    };
    if root.local_name() != expected_root.as_str() {
        issues.push(StructuralIssue::UnexpectedRoot {
            expected: expected_root.clone(),
            found: root.name().to_string(),
        });
        return issues;
    }
    check_prefix(&root, &mut issues);

    let units: Vec<&Element> = match envelope.mode() {
        Mode::Single => vec![&root],
        Mode::Batch => {
            let has_identifier = root
                .attributes()
                .keys()
                .any(|k| k == edoc_core::ID_ATTRIBUTE || k.ends_with(":Id"));
            if has_identifier {
                issues.push(StructuralIssue::BatchWrapperIdentifier);
            }
            for _ in root.elements().filter(|e| e.local_name() == SIGNATURE) {
                issues.push(StructuralIssue::SignatureOutsideRoot {
                    parent: root.name().to_string(),
                });
            }
            let units: Vec<&Element> = root
                .elements()
                .filter(|e| e.local_name() == names.unit_element)
                .collect();
            for unit in &units {
                check_prefix(unit, &mut issues);
            }
            units
        }
    };

    for (index, unit) in units.iter().enumerate() {
        check_unit(index + 1, unit, profile, &mut issues);
    }

    for element in root.descendants() {
        if element.elements().next().is_some() {
            continue;
        }
        let text = element.text();
        if let Some(digits) = fraction_digits(&text) {
            if digits > profile.max_fraction_digits {
                issues.push(StructuralIssue::SubSecondTimestamp {
                    element: element.local_name().to_string(),
                    value: text.trim().to_string(),
                });
            }
        }
    }

    if !issues.is_empty() {
        tracing::debug!(
            mode = %envelope.mode(),
            issues = issues.len(),
            "structural validation found issues"
        );
    }
    issues
}

fn check_unit(
    position: usize,
    unit: &Element,
    profile: &ValidationProfile,
    issues: &mut Vec<StructuralIssue>,
) {
    let names = &profile.envelope;
    match unit.elements().next() {
        Some(first) if first.local_name() == names.version_element => {
            let found = first.text();
            if found.trim() != names.format_version {
                issues.push(StructuralIssue::FormatVersionMismatch {
                    unit: position,
                    expected: names.format_version.clone(),
                    found,
                });
            }
        }
        _ => issues.push(StructuralIssue::MissingFormatVersion { unit: position }),
    }

    for _ in unit.elements().filter(|e| e.local_name() == SIGNATURE) {
        issues.push(StructuralIssue::SignatureOutsideRoot {
            parent: unit.name().to_string(),
        });
    }

    match unit.child(&names.root_element) {
        Some(signable) => check_signable_root(position, signable, issues),
        None => issues.push(StructuralIssue::MissingSignableRoot { unit: position }),
    }

    for url_element in unit
        .elements()
        .filter(|e| e.local_name() == names.artifact_group)
        .flat_map(|g| g.descendants())
        .filter(|e| e.local_name() == names.artifact_element)
    {
        let url = url_element.text();
        if !separator_precedes_parameters(&url) {
            issues.push(StructuralIssue::VerificationUrlSeparator { url });
        }
    }
}

fn check_signable_root(position: usize, root: &Element, issues: &mut Vec<StructuralIssue>) {
    check_prefix(root, issues);
    let document = root
        .attr(edoc_core::ID_ATTRIBUTE)
        .map(str::to_string)
        .unwrap_or_else(|| format!("unit {position}"));

    let signatures: Vec<&Element> = root
        .elements()
        .filter(|e| e.local_name() == SIGNATURE)
        .collect();
    match signatures.len() {
        0 => issues.push(StructuralIssue::MissingSignature {
            document: document.clone(),
        }),
        1 => {
            check_prefix(signatures[0], issues);
            if root.last_element().map(Element::local_name) != Some(SIGNATURE) {
                issues.push(StructuralIssue::SignatureNotLast {
                    document: document.clone(),
                });
            }
        }
        count => issues.push(StructuralIssue::MultipleSignatures {
            document: document.clone(),
            count,
        }),
    }

    for child in root.elements().filter(|e| e.local_name() != SIGNATURE) {
        for _ in child.descendants().filter(|e| e.local_name() == SIGNATURE) {
            issues.push(StructuralIssue::SignatureOutsideRoot {
                parent: child.name().to_string(),
            });
        }
    }
}

fn check_prefix(element: &Element, issues: &mut Vec<StructuralIssue>) {
    if element.prefix().is_some() {
        issues.push(StructuralIssue::NamespacePrefix {
            element: element.name().to_string(),
        });
    }
}

/// `?` must be present and come before the first `&`.
fn separator_precedes_parameters(url: &str) -> bool {
    match (url.find('?'), url.find('&')) {
        (None, _) => false,
        (Some(q), Some(a)) => q < a,
        (Some(_), None) => true,
    }
}
