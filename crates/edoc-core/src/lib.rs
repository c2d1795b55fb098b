//! # edoc-core — Foundational Types for the Document Pipeline
//!
//! This crate is the leaf of the edoc workspace. It defines the document tree
//! that every other crate builds, signs, assembles and inspects, and the single
//! canonicalization path that turns a tree into bytes.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** All digest and signature input flows
//!    through [`CanonicalBytes`], whose only constructors run the exclusive
//!    canonicalization algorithm. There is no way to hash or sign a "fresh
//!    render" of a tree by accident.
//!
//! 2. **`sha256_digest()` accepts only `&CanonicalBytes`.** Compile-time
//!    enforcement that every digest in the pipeline is computed over
//!    canonical bytes.
//!
//! 3. **Identifier on construction.** A [`Document`] cannot exist without a
//!    non-empty identifier attribute on its signable root.
//!
//! 4. **Second-precision timestamps.** [`Timestamp`] renders emission times
//!    at the precision the remote profile accepts.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `edoc-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod document;
pub mod error;
pub mod namespace;
pub mod parse;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::{
    canonicalize, canonicalize_in_scope, escape_attribute, escape_text, CanonicalBytes,
};
pub use digest::{sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm};
pub use document::{Document, Element, Node, ID_ATTRIBUTE};
pub use error::{CanonicalizationError, DocumentError, EdocError, ParseError};
pub use namespace::{NamespaceScope, XML_NAMESPACE};
pub use parse::parse;
pub use temporal::{fraction_digits, truncate_subsecond, Timestamp, TIMESTAMP_FORMAT};
