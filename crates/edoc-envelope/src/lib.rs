//! # edoc-envelope — Verification Codes, Assembly and Validation
//!
//! Everything between a signed document and the bytes handed to transport:
//!
//! - [`qr`]: the public verification URL derived from ordered fields and a
//!   shared secret that never appears in the output.
//! - [`assemble`]: transport units and envelopes built around the signed
//!   root's canonical bytes, in the strict child order the remote service
//!   checks.
//! - [`package`]: single-entry zip archives for batch transport.
//! - [`validate`]: local structural checks on envelope bytes, each issue
//!   reporting whether a mechanical correction exists.
//!
//! Element names, namespace and limits come from [`EnvelopeProfile`] and
//! [`ValidationProfile`]; their defaults describe the remote profile in use.

pub mod assemble;
pub mod config;
pub mod error;
pub mod package;
pub mod profile;
pub mod qr;
pub mod validate;

pub use assemble::{assemble, AssemblyItem, Envelope, Mode};
pub use config::{ConfigError, VerificationConfig, MIN_SECRET_LEN};
pub use error::{EnvelopeError, QrError};
pub use package::{package, unpack, DEFAULT_ENTRY_NAME};
pub use profile::{EnvelopeProfile, ValidationProfile};
pub use qr::{
    generate, generate_with_param, FieldSelection, FieldSource, OrderedFields, QrFields, Secret,
    VerificationArtifact,
};
pub use validate::{validate, LocalCorrection, StructuralIssue};
