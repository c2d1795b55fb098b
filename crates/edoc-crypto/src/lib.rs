//! # edoc-crypto — Signature Engine
//!
//! Provides the cryptographic half of the pipeline:
//!
//! - **Signing identities** behind the [`SigningIdentity`] capability trait,
//!   loaded from PEM bundles (encrypted PKCS#8 RSA key plus X.509 chain).
//! - **Enveloped signatures**: [`sign()`] digests the exclusive-canonical
//!   form of a [`edoc_core::Document`], signs the canonical `SignedInfo`
//!   with RSASSA-PKCS1-v1_5/SHA-256 and appends the signature block as the
//!   root's last child, returning an immutable [`SignedDocument`].
//! - **Verification** of signed documents and of signable roots re-parsed
//!   from assembled envelopes.
//!
//! ## Crate Policy
//!
//! - Depends only on `edoc-core` internally.
//! - No mocking of cryptographic operations in tests: all tests use real
//!   RSA keys from `fixtures/`, real SHA-256 and real canonical bytes.
//! - Key material never reaches `Debug`, `Display` or logs.

pub mod dsig;
pub mod error;
pub mod identity;
pub mod verify;

pub use dsig::{
    sign, SignedDocument, DSIG_NAMESPACE, ENVELOPED_SIGNATURE, EXC_C14N, RSA_SHA256,
};
pub use error::{CryptoError, IdentityError, SignError, VerificationError};
pub use identity::{
    load_identity, load_identity_at, load_identity_from_env, CertificateChain, RsaIdentity,
    SerializedIdentity, SigningBackend, SigningIdentity, IDENTITY_PASSPHRASE_ENV, IDENTITY_PATH_ENV,
    MIN_RSA_BITS,
};
pub use verify::{verify, verify_element};
