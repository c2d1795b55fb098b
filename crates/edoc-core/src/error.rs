//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error types shared by every crate in the workspace. All errors
//! use `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Malformed input (unresolvable namespaces, missing identifiers,
//!   unparseable markup) is unrecoverable: the caller must fix the data.
//! - Errors carry the element or prefix that triggered them so an operator
//!   can locate the problem in the source document.

use thiserror::Error;

/// Top-level error type for `edoc-core` operations.
#[derive(Error, Debug)]
pub enum EdocError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// The document violates a structural precondition.
    #[error("malformed document: {0}")]
    Document(#[from] DocumentError),

    /// Markup could not be parsed into a document tree.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A timestamp string is not in the accepted form.
    #[error("invalid timestamp {value:?}: {reason}")]
    Timestamp {
        /// The offending text.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Error during canonical serialization.
///
/// Every variant belongs to the `MalformedDocument` class: the tree cannot
/// be rendered deterministically as given.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CanonicalizationError {
    /// An element or attribute uses a namespace prefix with no in-scope
    /// declaration.
    #[error("unresolved namespace prefix '{prefix}' on <{element}>")]
    UnresolvedPrefix {
        /// Qualified name of the element carrying the reference.
        element: String,
        /// The prefix that could not be resolved.
        prefix: String,
    },

    /// A name is syntactically unusable (empty, or more than one colon).
    #[error("invalid qualified name '{0}'")]
    InvalidName(String),
}

/// Structural precondition failures on a [`crate::Document`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The signable root carries no identifier attribute.
    #[error("signable root <{element}> has no '{attribute}' attribute")]
    MissingIdentifier {
        /// Root element name.
        element: String,
        /// The identifier attribute that was expected.
        attribute: String,
    },

    /// The identifier attribute is present but empty or blank.
    #[error("signable root <{element}> has an empty identifier")]
    EmptyIdentifier {
        /// Root element name.
        element: String,
    },
}

/// Markup parse failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The underlying tokenizer rejected the input.
    #[error("malformed markup at byte {position}: {message}")]
    Syntax {
        /// Byte offset reported by the tokenizer.
        position: u64,
        /// Tokenizer message.
        message: String,
    },

    /// Document type declarations are refused (no entity expansion).
    #[error("document type declarations are not accepted")]
    DoctypeRejected,

    /// Closing tag does not match the open element.
    #[error("mismatched closing tag: expected </{expected}>, found </{found}>")]
    MismatchedTag {
        /// Name of the element that was open.
        expected: String,
        /// Name found in the closing tag.
        found: String,
    },

    /// Input ended with open elements, or contained no element at all.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// More than one top-level element.
    #[error("multiple top-level elements")]
    MultipleRoots,

    /// Non-whitespace text outside the document element.
    #[error("text content outside the document element")]
    TextOutsideRoot,
}
