//! # Enveloped Signatures
//!
//! Produces the signature block embedded as the last child of the signable
//! root:
//!
//! ```text
//! <Signature xmlns="http://www.w3.org/2000/09/xmldsig#">
//!   <SignedInfo>
//!     <CanonicalizationMethod Algorithm="…xml-exc-c14n#"/>
//!     <SignatureMethod Algorithm="…xmldsig-more#rsa-sha256"/>
//!     <Reference URI="#Id">
//!       <Transforms><Transform Algorithm="…#enveloped-signature"/></Transforms>
//!       <DigestMethod Algorithm="…xmlenc#sha256"/>
//!       <DigestValue>base64</DigestValue>
//!     </Reference>
//!   </SignedInfo>
//!   <SignatureValue>base64</SignatureValue>
//!   <KeyInfo><X509Data><X509Certificate>base64</X509Certificate>…</X509Data></KeyInfo>
//! </Signature>
//! ```
//!
//! ## Security Invariant
//!
//! [`sign()`] consumes the [`Document`]. The returned [`SignedDocument`] has
//! no mutators and no conversion back, so nothing can edit a signed tree or
//! re-render it differently from the bytes that were signed.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use edoc_core::{
    sha256_digest, CanonicalBytes, ContentDigest, DigestAlgorithm, Document, Element,
    NamespaceScope, Node,
};

use crate::error::SignError;
use crate::identity::SigningIdentity;

/// XML-DSig namespace, the default namespace of the signature block.
pub const DSIG_NAMESPACE: &str = "http://www.w3.org/2000/09/xmldsig#";

/// Exclusive canonicalization 1.0 without comments.
pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

/// RSASSA-PKCS1-v1_5 with SHA-256.
pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

/// The enveloped-signature transform.
pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

/// Local names of the signature block's elements.
pub mod node {
    pub const SIGNATURE: &str = "Signature";
    pub const SIGNED_INFO: &str = "SignedInfo";
    pub const CANONICALIZATION_METHOD: &str = "CanonicalizationMethod";
    pub const SIGNATURE_METHOD: &str = "SignatureMethod";
    pub const REFERENCE: &str = "Reference";
    pub const TRANSFORMS: &str = "Transforms";
    pub const TRANSFORM: &str = "Transform";
    pub const DIGEST_METHOD: &str = "DigestMethod";
    pub const DIGEST_VALUE: &str = "DigestValue";
    pub const SIGNATURE_VALUE: &str = "SignatureValue";
    pub const KEY_INFO: &str = "KeyInfo";
    pub const X509_DATA: &str = "X509Data";
    pub const X509_CERTIFICATE: &str = "X509Certificate";
}

/// Attribute names used in the signature block.
pub mod attr {
    pub const ALGORITHM: &str = "Algorithm";
    pub const URI: &str = "URI";
}

/// A signed document. Immutable.
///
/// # Invariants
///
/// - The root's last element child is the only `Signature` block.
/// - `canonical` is the exact canonical form of `root` at signing time and
///   is what the assembler embeds.
/// - `digest` is the digest of the root without its signature block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedDocument {
    root: Element,
    canonical: CanonicalBytes,
    digest: ContentDigest,
}

impl SignedDocument {
    /// The signable root's identifier.
    pub fn id(&self) -> &str {
        self.root.attr(edoc_core::ID_ATTRIBUTE).unwrap_or_default()
    }

    /// The signed root, signature block included.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Canonical bytes of the signed root as produced at signing time.
    pub fn canonical(&self) -> &CanonicalBytes {
        &self.canonical
    }

    /// Digest of the root minus its signature block.
    pub fn digest(&self) -> &ContentDigest {
        &self.digest
    }

    /// The signature block.
    pub fn signature(&self) -> Option<&Element> {
        self.root
            .last_element()
            .filter(|e| e.local_name() == node::SIGNATURE)
    }

    /// Text of the first descendant of the root with the given local name,
    /// outside the signature block.
    pub fn field(&self, local: &str) -> Option<String> {
        self.root
            .elements()
            .filter(|e| e.local_name() != node::SIGNATURE)
            .find_map(|e| e.find(local))
            .map(Element::text)
    }
}

/// Sign a document with an enveloped RSA-SHA256 signature.
///
/// # Errors
///
/// - [`SignError::Document`] if the identifier was lost during edits.
/// - [`SignError::AlreadySigned`] if the root already has a signature block.
/// - [`SignError::Canonicalization`] for unresolvable prefixes.
/// - [`SignError::Crypto`] if the identity fails to sign.
pub fn sign(document: Document, identity: &dyn SigningIdentity) -> Result<SignedDocument, SignError> {
    let mut root = document.into_root()?;
    let id = root.attr(edoc_core::ID_ATTRIBUTE).unwrap_or_default().to_string();
    if root.elements().any(|e| e.local_name() == node::SIGNATURE) {
        return Err(SignError::AlreadySigned { id });
    }
    root.strip_inter_element_whitespace();

    let canonical = CanonicalBytes::of(&root)?;
    let digest = sha256_digest(&canonical);

    let signed_info = signed_info(&id, &digest);
    let scope = NamespaceScope::new()
        .extended(&root)
        .extended(&Element::new(node::SIGNATURE).with_default_namespace(DSIG_NAMESPACE));
    let signed_info_bytes = CanonicalBytes::in_scope(&signed_info, &scope)?;
    let signature_value = identity.sign(&signed_info_bytes)?;

    let x509_data = identity
        .certificate()
        .to_base64()
        .into_iter()
        .fold(Element::new(node::X509_DATA), |data, cert| {
            data.with_child(Element::leaf(node::X509_CERTIFICATE, cert))
        });
    let signature = Element::new(node::SIGNATURE)
        .with_default_namespace(DSIG_NAMESPACE)
        .with_child(signed_info)
        .with_child(Element::leaf(
            node::SIGNATURE_VALUE,
            STANDARD.encode(&signature_value),
        ))
        .with_child(Element::new(node::KEY_INFO).with_child(x509_data));
    root.push(Node::Element(signature));

    let signed_canonical = CanonicalBytes::of(&root)?;
    tracing::debug!(
        doc_id = %id,
        digest = %digest,
        provider = identity.provider_name(),
        bytes = signed_canonical.len(),
        "document signed"
    );

    Ok(SignedDocument {
        root,
        canonical: signed_canonical,
        digest,
    })
}

fn signed_info(id: &str, digest: &ContentDigest) -> Element {
    Element::new(node::SIGNED_INFO)
        .with_child(Element::new(node::CANONICALIZATION_METHOD).with_attr(attr::ALGORITHM, EXC_C14N))
        .with_child(Element::new(node::SIGNATURE_METHOD).with_attr(attr::ALGORITHM, RSA_SHA256))
        .with_child(
            Element::new(node::REFERENCE)
                .with_attr(attr::URI, format!("#{id}"))
                .with_child(
                    Element::new(node::TRANSFORMS).with_child(
                        Element::new(node::TRANSFORM).with_attr(attr::ALGORITHM, ENVELOPED_SIGNATURE),
                    ),
                )
                .with_child(
                    Element::new(node::DIGEST_METHOD)
                        .with_attr(attr::ALGORITHM, DigestAlgorithm::Sha256.uri()),
                )
                .with_child(Element::leaf(node::DIGEST_VALUE, digest.to_base64())),
        )
}
