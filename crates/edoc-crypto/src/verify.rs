//! # Signature Verification
//!
//! Checks an enveloped signature against the subtree it covers. Works on a
//! [`SignedDocument`] straight from [`crate::sign()`], or on a signable root
//! re-parsed from an assembled envelope together with the namespace scope it
//! sits in.
//!
//! Checks run in this order and stop at the first failure: signature block
//! placement, algorithm URIs, reference URI, transform list, digest,
//! signature value.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use edoc_core::{
    sha256_digest, CanonicalBytes, ContentDigest, DigestAlgorithm, Element, NamespaceScope,
    ID_ATTRIBUTE,
};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use x509_cert::der::Decode;
use x509_cert::Certificate;

use crate::dsig::{attr, node, SignedDocument, ENVELOPED_SIGNATURE, EXC_C14N, RSA_SHA256};
use crate::error::VerificationError;
use crate::identity::certificate_public_key;

/// Verify a document produced by [`crate::sign()`].
pub fn verify(signed: &SignedDocument) -> Result<(), VerificationError> {
    verify_element(signed.root(), &NamespaceScope::new())
}

/// Verify a signable root whose ancestors declared `inherited`.
pub fn verify_element(root: &Element, inherited: &NamespaceScope) -> Result<(), VerificationError> {
    let signature_count = root
        .elements()
        .filter(|e| e.local_name() == node::SIGNATURE)
        .count();
    match signature_count {
        0 => return Err(VerificationError::MissingSignature),
        1 => {}
        n => return Err(VerificationError::MultipleSignatures(n)),
    }
    let signature = root
        .last_element()
        .filter(|e| e.local_name() == node::SIGNATURE)
        .ok_or(VerificationError::SignatureNotLast)?;

    let signed_info = required(signature, node::SIGNED_INFO)?;
    expect_algorithm(required(signed_info, node::CANONICALIZATION_METHOD)?, EXC_C14N)?;
    expect_algorithm(required(signed_info, node::SIGNATURE_METHOD)?, RSA_SHA256)?;

    let references: Vec<_> = signed_info
        .elements()
        .filter(|e| e.local_name() == node::REFERENCE)
        .collect();
    let [reference] = references.as_slice() else {
        return Err(VerificationError::MalformedSignature(format!(
            "expected one Reference, found {}",
            references.len()
        )));
    };

    let id = root.attr(ID_ATTRIBUTE).unwrap_or_default();
    let expected_uri = format!("#{id}");
    let found_uri = reference.attr(attr::URI).unwrap_or_default();
    if id.is_empty() || found_uri != expected_uri {
        return Err(VerificationError::ReferenceMismatch {
            expected: expected_uri,
            found: found_uri.to_string(),
        });
    }

    let transforms: Vec<String> = reference
        .child(node::TRANSFORMS)
        .map(|t| {
            t.elements()
                .filter(|e| e.local_name() == node::TRANSFORM)
                .map(|e| e.attr(attr::ALGORITHM).unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default();
    if transforms.len() != 1 || transforms[0] != ENVELOPED_SIGNATURE {
        return Err(VerificationError::UnsupportedTransforms(transforms));
    }

    let digest_method = required(reference, node::DIGEST_METHOD)?
        .attr(attr::ALGORITHM)
        .unwrap_or_default();
    if DigestAlgorithm::from_uri(digest_method).is_none() {
        return Err(VerificationError::UnsupportedAlgorithm(digest_method.to_string()));
    }
    let embedded_text = required(reference, node::DIGEST_VALUE)?.text();
    let embedded = ContentDigest::from_base64(&embedded_text).ok_or_else(|| {
        VerificationError::MalformedSignature("DigestValue is not a base64 SHA-256 digest".into())
    })?;

    let computed = sha256_digest(&CanonicalBytes::in_scope(&without_signature(root), inherited)?);
    if !bool::from(computed.bytes[..].ct_eq(&embedded.bytes[..])) {
        return Err(VerificationError::DigestMismatch {
            embedded: embedded.to_base64(),
            computed: computed.to_base64(),
        });
    }

    let signed_info_scope = inherited.extended(root).extended(signature);
    let signed_info_bytes = CanonicalBytes::in_scope(signed_info, &signed_info_scope)?;

    let signature_value = decode_base64(&required(signature, node::SIGNATURE_VALUE)?.text())
        .ok_or_else(|| VerificationError::MalformedSignature("SignatureValue is not base64".into()))?;
    let leaf_text = signature
        .child(node::KEY_INFO)
        .and_then(|k| k.child(node::X509_DATA))
        .and_then(|d| d.child(node::X509_CERTIFICATE))
        .map(Element::text)
        .ok_or_else(|| VerificationError::MalformedSignature("no X509Certificate".into()))?;
    let leaf_der = decode_base64(&leaf_text)
        .ok_or_else(|| VerificationError::Certificate("X509Certificate is not base64".into()))?;
    let leaf = Certificate::from_der(&leaf_der)
        .map_err(|e| VerificationError::Certificate(e.to_string()))?;
    let public_key = certificate_public_key(&leaf).map_err(VerificationError::Certificate)?;

    let signature = Signature::try_from(signature_value.as_slice())
        .map_err(|_| VerificationError::SignatureInvalid)?;
    VerifyingKey::<Sha256>::new(public_key)
        .verify(signed_info_bytes.as_bytes(), &signature)
        .map_err(|_| VerificationError::SignatureInvalid)?;

    tracing::debug!(doc_id = %id, digest = %computed, "signature verified");
    Ok(())
}

/// The root with its trailing signature block removed (the enveloped
/// transform).
fn without_signature(root: &Element) -> Element {
    let mut stripped = root.clone();
    if let Some(index) = stripped
        .children()
        .iter()
        .rposition(|n| n.as_element().is_some_and(|e| e.local_name() == node::SIGNATURE))
    {
        stripped.children_mut().remove(index);
    }
    stripped
}

fn required<'a>(parent: &'a Element, local: &str) -> Result<&'a Element, VerificationError> {
    parent
        .child(local)
        .ok_or_else(|| VerificationError::MalformedSignature(format!("missing {local}")))
}

fn expect_algorithm(element: &Element, expected: &str) -> Result<(), VerificationError> {
    match element.attr(attr::ALGORITHM) {
        Some(found) if found == expected => Ok(()),
        Some(found) => Err(VerificationError::UnsupportedAlgorithm(found.to_string())),
        None => Err(VerificationError::MalformedSignature(format!(
            "{} has no Algorithm",
            element.local_name()
        ))),
    }
}

/// Base64 with embedded line breaks tolerated.
fn decode_base64(text: &str) -> Option<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact).ok()
}
