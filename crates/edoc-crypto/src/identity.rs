//! # Signing Identities
//!
//! Abstracts the private key and certificate chain behind a capability
//! trait, so the signature engine never touches key material directly:
//!
//! - [`RsaIdentity`]: RSA key and X.509 chain loaded from a PEM bundle.
//! - [`SerializedIdentity`]: wraps a backend that must not be used from two
//!   threads at once (hardware tokens, single-session HSM handles) and
//!   serializes `sign()` calls behind a per-identity mutex.
//!
//! ## Security Invariants
//!
//! - `SigningIdentity` is `Send + Sync` for use across async tasks.
//! - Signing input is `&CanonicalBytes` (never raw bytes).
//! - Private keys are zeroized on drop; passphrases are held in
//!   `Zeroizing` buffers; `Debug` output never shows key material.
//! - Keys below 2048 bits, mismatched key/certificate pairs and certificates
//!   outside their validity window are refused at load time.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use edoc_core::CanonicalBytes;
use parking_lot::Mutex;
use pkcs8::der::{pem, Decode, Encode};
use pkcs8::EncryptedPrivateKeyInfo;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::signature::{SignatureEncoding, Signer};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use x509_cert::Certificate;
use zeroize::Zeroizing;

use crate::error::{CryptoError, IdentityError};

const ENCRYPTED_KEY_LABEL: &str = "ENCRYPTED PRIVATE KEY";
const KEY_LABEL: &str = "PRIVATE KEY";
const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Smallest accepted RSA modulus, in bits.
pub const MIN_RSA_BITS: usize = 2048;

/// Environment variable naming the identity bundle path.
pub const IDENTITY_PATH_ENV: &str = "EDOC_IDENTITY_PATH";

/// Environment variable holding the bundle passphrase.
pub const IDENTITY_PASSPHRASE_ENV: &str = "EDOC_IDENTITY_PASSPHRASE";

/// Capability to sign canonical bytes with a certified key.
///
/// Implementations must be `Send + Sync` for use in multi-threaded async
/// runtimes.
pub trait SigningIdentity: Send + Sync {
    /// Sign canonical bytes (RSASSA-PKCS1-v1_5 with SHA-256).
    fn sign(&self, data: &CanonicalBytes) -> Result<Vec<u8>, CryptoError>;

    /// The certificate chain to embed, leaf first.
    fn certificate(&self) -> &CertificateChain;

    /// Human-readable name for this provider (for diagnostics/logging).
    fn provider_name(&self) -> &str;
}

// ─── CertificateChain ────────────────────────────────────────────────────

/// DER-encoded certificates, leaf first. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateChain {
    der: Vec<Vec<u8>>,
}

impl CertificateChain {
    /// Build a chain from DER certificates, leaf first.
    pub fn new(der: Vec<Vec<u8>>) -> Result<Self, IdentityError> {
        if der.is_empty() {
            return Err(IdentityError::MalformedCertificate(
                "certificate chain is empty".into(),
            ));
        }
        Ok(Self { der })
    }

    /// The leaf certificate.
    pub fn leaf(&self) -> &[u8] {
        &self.der[0]
    }

    /// All certificates, leaf first.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.der.iter().map(Vec::as_slice)
    }

    /// Number of certificates.
    pub fn len(&self) -> usize {
        self.der.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.der.is_empty()
    }

    /// Base64 of each certificate, as embedded in `X509Certificate`.
    pub fn to_base64(&self) -> Vec<String> {
        self.der.iter().map(|c| STANDARD.encode(c)).collect()
    }
}

// ─── RsaIdentity ─────────────────────────────────────────────────────────

/// RSA private key plus certificate chain.
pub struct RsaIdentity {
    key: SigningKey<Sha256>,
    chain: CertificateChain,
    subject: String,
    bits: usize,
}

impl RsaIdentity {
    /// Pair a private key with its chain, applying the same checks as
    /// [`load_identity_at`].
    pub fn new(
        private_key: RsaPrivateKey,
        chain: CertificateChain,
        now: DateTime<Utc>,
    ) -> Result<Self, IdentityError> {
        let bits = private_key.size() * 8;
        if bits < MIN_RSA_BITS {
            return Err(IdentityError::KeyTooSmall { bits });
        }
        let leaf = Certificate::from_der(chain.leaf())
            .map_err(|e| IdentityError::MalformedCertificate(e.to_string()))?;
        check_validity(&leaf, now)?;
        let certified = certificate_public_key(&leaf)
            .map_err(IdentityError::MalformedCertificate)?;
        if RsaPublicKey::from(&private_key) != certified {
            return Err(IdentityError::KeyCertificateMismatch);
        }
        Ok(Self {
            key: SigningKey::<Sha256>::new(private_key),
            chain,
            subject: leaf.tbs_certificate.subject.to_string(),
            bits,
        })
    }

    /// Subject distinguished name of the leaf certificate.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        self.bits
    }
}

impl std::fmt::Debug for RsaIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaIdentity")
            .field("key", &"<private>")
            .field("bits", &self.bits)
            .field("subject", &self.subject)
            .field("chain_len", &self.chain.len())
            .finish()
    }
}

impl SigningIdentity for RsaIdentity {
    fn sign(&self, data: &CanonicalBytes) -> Result<Vec<u8>, CryptoError> {
        let signature = self
            .key
            .try_sign(data.as_bytes())
            .map_err(|e| CryptoError::Signing(e.to_string()))?;
        Ok(signature.to_vec())
    }

    fn certificate(&self) -> &CertificateChain {
        &self.chain
    }

    fn provider_name(&self) -> &str {
        "RsaIdentity"
    }
}

// ─── SerializedIdentity ──────────────────────────────────────────────────

/// A signing backend that is `Send` but not safe for concurrent use.
pub trait SigningBackend: Send {
    /// Sign canonical bytes; may mutate session state.
    fn sign(&mut self, data: &CanonicalBytes) -> Result<Vec<u8>, CryptoError>;
}

/// Serializes access to a non-thread-safe backend with a per-identity lock.
pub struct SerializedIdentity<B: SigningBackend> {
    backend: Mutex<B>,
    chain: CertificateChain,
    name: String,
}

impl<B: SigningBackend> SerializedIdentity<B> {
    /// Wrap a backend with the chain it signs for.
    pub fn new(backend: B, chain: CertificateChain, name: impl Into<String>) -> Self {
        Self {
            backend: Mutex::new(backend),
            chain,
            name: name.into(),
        }
    }
}

impl<B: SigningBackend> SigningIdentity for SerializedIdentity<B> {
    fn sign(&self, data: &CanonicalBytes) -> Result<Vec<u8>, CryptoError> {
        self.backend.lock().sign(data)
    }

    fn certificate(&self) -> &CertificateChain {
        &self.chain
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}

impl<B: SigningBackend> std::fmt::Debug for SerializedIdentity<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SerializedIdentity({}, <private>)", self.name)
    }
}

// ─── Loading ─────────────────────────────────────────────────────────────

/// Load an identity from a PEM bundle, checking validity against the
/// current time.
///
/// The bundle holds one private key (`ENCRYPTED PRIVATE KEY` or
/// `PRIVATE KEY`, PKCS#8) and one or more `CERTIFICATE` blocks, leaf first.
pub fn load_identity(
    path: impl AsRef<Path>,
    passphrase: Option<&str>,
) -> Result<RsaIdentity, IdentityError> {
    load_identity_at(path, passphrase, Utc::now())
}

/// As [`load_identity`], with an explicit clock.
pub fn load_identity_at(
    path: impl AsRef<Path>,
    passphrase: Option<&str>,
    now: DateTime<Utc>,
) -> Result<RsaIdentity, IdentityError> {
    let path = path.as_ref();
    let text = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
        IdentityError::NotFound {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    })?);
    let passphrase = passphrase.map(|p| Zeroizing::new(p.as_bytes().to_vec()));

    let blocks = decode_bundle(&text)?;
    let private_key = decode_private_key(&blocks, passphrase.as_deref().map(Vec::as_slice))?;
    let chain = decode_chain(&blocks)?;
    let identity = RsaIdentity::new(private_key, chain, now)?;

    tracing::info!(
        path = %path.display(),
        subject = %identity.subject(),
        bits = identity.bits(),
        "signing identity loaded"
    );
    Ok(identity)
}

/// Load the identity named by `EDOC_IDENTITY_PATH`, decrypting with
/// `EDOC_IDENTITY_PASSPHRASE` when set.
pub fn load_identity_from_env() -> Result<RsaIdentity, IdentityError> {
    let path = std::env::var(IDENTITY_PATH_ENV)
        .map_err(|_| IdentityError::MissingEnv(IDENTITY_PATH_ENV.to_string()))?;
    let passphrase = std::env::var(IDENTITY_PASSPHRASE_ENV).ok().map(Zeroizing::new);
    load_identity(path, passphrase.as_deref().map(String::as_str))
}

/// One decoded document of a PEM bundle.
struct PemBlock {
    label: String,
    der: Zeroizing<Vec<u8>>,
}

/// Split a bundle at its encapsulation boundaries and decode each document
/// with RFC 7468 rules. Text outside the boundaries is ignored.
fn decode_bundle(text: &str) -> Result<Vec<PemBlock>, IdentityError> {
    let mut blocks = Vec::new();
    let mut current: Option<Zeroizing<String>> = None;
    for line in text.lines() {
        let line = line.trim_end();
        if line.starts_with("-----BEGIN ") {
            current = Some(Zeroizing::new(String::new()));
        }
        let Some(block) = current.as_mut() else {
            continue;
        };
        block.push_str(line);
        block.push('\n');
        if line.starts_with("-----END ") {
            let (label, der) = pem::decode_vec(block.as_bytes())
                .map_err(|e| IdentityError::MalformedPem(e.to_string()))?;
            blocks.push(PemBlock {
                label: label.to_string(),
                der: Zeroizing::new(der),
            });
            current = None;
        }
    }
    if current.is_some() {
        return Err(IdentityError::MalformedPem(
            "unterminated block at end of bundle".into(),
        ));
    }
    Ok(blocks)
}

fn decode_private_key(
    blocks: &[PemBlock],
    passphrase: Option<&[u8]>,
) -> Result<RsaPrivateKey, IdentityError> {
    let block = blocks
        .iter()
        .find(|b| b.label == ENCRYPTED_KEY_LABEL || b.label == KEY_LABEL)
        .ok_or_else(|| IdentityError::MalformedKey("no PKCS#8 private key block in bundle".into()))?;
    if block.label == KEY_LABEL {
        return RsaPrivateKey::from_pkcs8_der(&block.der)
            .map_err(|e| IdentityError::MalformedKey(e.to_string()));
    }
    let passphrase = passphrase.ok_or(IdentityError::BadPassphrase)?;
    let encrypted = EncryptedPrivateKeyInfo::from_der(&block.der)
        .map_err(|e| IdentityError::MalformedKey(e.to_string()))?;
    let decrypted = encrypted
        .decrypt(passphrase)
        .map_err(|_| IdentityError::BadPassphrase)?;
    RsaPrivateKey::from_pkcs8_der(decrypted.as_bytes()).map_err(|_| IdentityError::BadPassphrase)
}

fn decode_chain(blocks: &[PemBlock]) -> Result<CertificateChain, IdentityError> {
    let mut der = Vec::new();
    for block in blocks.iter().filter(|b| b.label == CERTIFICATE_LABEL) {
        Certificate::from_der(&block.der)
            .map_err(|e| IdentityError::MalformedCertificate(e.to_string()))?;
        der.push(block.der.to_vec());
    }
    if der.is_empty() {
        return Err(IdentityError::MalformedCertificate(
            "no certificate block in bundle".into(),
        ));
    }
    CertificateChain::new(der)
}

fn check_validity(cert: &Certificate, now: DateTime<Utc>) -> Result<(), IdentityError> {
    let validity = &cert.tbs_certificate.validity;
    let not_before = validity.not_before.to_unix_duration().as_secs();
    let not_after = validity.not_after.to_unix_duration().as_secs();
    let now = u64::try_from(now.timestamp()).unwrap_or(0);
    if now < not_before {
        return Err(IdentityError::NotYetValid { not_before });
    }
    if now > not_after {
        return Err(IdentityError::Expired { not_after });
    }
    Ok(())
}

/// RSA public key carried by a certificate.
pub(crate) fn certificate_public_key(cert: &Certificate) -> Result<RsaPublicKey, String> {
    let spki = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| e.to_string())?;
    RsaPublicKey::from_public_key_der(&spki).map_err(|e| e.to_string())
}
