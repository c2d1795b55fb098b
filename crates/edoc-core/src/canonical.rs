//! # Canonical Serialization — Exclusive Canonicalization
//!
//! This module defines `CanonicalBytes`, the sole construction path for bytes
//! used in digest and signature computation across the workspace.
//!
//! ## Security Invariant
//!
//! The `CanonicalBytes` newtype has a private inner field. The only way to
//! construct it is through [`CanonicalBytes::of()`] or
//! [`CanonicalBytes::in_scope()`], which run Exclusive XML Canonicalization
//! 1.0 (without comments) over an [`Element`] tree. Any function that hashes
//! or signs must accept `&CanonicalBytes`, so a digest over an ad-hoc render
//! cannot be computed by accident.
//!
//! ## Rules
//!
//! 1. **Visibly utilized namespaces only.** A declaration is emitted on an
//!    element when the element's own prefix, or one of its attributes'
//!    prefixes, needs it and no output ancestor already rendered the same
//!    binding. An unprefixed element below an output ancestor that rendered a
//!    non-empty default gets `xmlns=""`.
//! 2. **Ordering.** Namespace declarations by prefix (default first), then
//!    attributes by (namespace URI, local name); unqualified attributes first.
//! 3. **Empty elements** render as a start/end tag pair.
//! 4. **Escaping.** Text: `&`, `<`, `>`, CR. Attribute values: `&`, `<`, `"`,
//!    TAB, LF, CR.
//! 5. **Text verbatim.** Whitespace-only text between elements is removed by
//!    the parser, not here; every text node in the tree is rendered.

use std::collections::{BTreeMap, BTreeSet};

use crate::document::{split_qname, Element, Node};
use crate::error::CanonicalizationError;
use crate::namespace::{NamespaceScope, XML_NAMESPACE, XML_PREFIX};

/// Bytes produced exclusively by exclusive canonicalization.
///
/// # Invariants
///
/// - Constructed only by [`CanonicalBytes::of()`] or
///   [`CanonicalBytes::in_scope()`].
/// - Two structurally equivalent trees produce identical bytes regardless of
///   attribute insertion order.
/// - The content is valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize a standalone subtree (no inherited bindings).
    pub fn of(element: &Element) -> Result<Self, CanonicalizationError> {
        Self::in_scope(element, &NamespaceScope::new())
    }

    /// Canonicalize a subtree whose prefixes resolve against the bindings
    /// inherited from its (unrendered) ancestors.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalizationError::UnresolvedPrefix`] if an element or
    /// attribute prefix has no binding in scope.
    pub fn in_scope(
        element: &Element,
        inherited: &NamespaceScope,
    ) -> Result<Self, CanonicalizationError> {
        let mut out = String::with_capacity(256);
        render(element, inherited, &BTreeMap::new(), &mut out)?;
        Ok(Self(out.into_bytes()))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The canonical form as text.
    pub fn as_str(&self) -> &str {
        // Only ever built from a `String`.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Canonicalize a standalone subtree.
pub fn canonicalize(element: &Element) -> Result<CanonicalBytes, CanonicalizationError> {
    CanonicalBytes::of(element)
}

/// Canonicalize a subtree under inherited bindings.
pub fn canonicalize_in_scope(
    element: &Element,
    inherited: &NamespaceScope,
) -> Result<CanonicalBytes, CanonicalizationError> {
    CanonicalBytes::in_scope(element, inherited)
}

/// Escape character data for canonical output.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an attribute value for canonical output.
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
    out
}

fn is_namespace_attribute(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}

fn check_name(name: &str) -> Result<(), CanonicalizationError> {
    let bad = name.is_empty()
        || name.matches(':').count() > 1
        || name.starts_with(':')
        || name.ends_with(':');
    if bad {
        return Err(CanonicalizationError::InvalidName(name.to_string()));
    }
    Ok(())
}

struct SortedAttribute<'a> {
    uri: &'a str,
    local: &'a str,
    qname: &'a str,
    value: &'a str,
}

/// Render one element. `rendered` holds the bindings already emitted by
/// output ancestors.
fn render(
    element: &Element,
    parent_scope: &NamespaceScope,
    rendered: &BTreeMap<String, String>,
    out: &mut String,
) -> Result<(), CanonicalizationError> {
    check_name(element.name())?;
    let scope = parent_scope.extended(element);

    // Visibly utilized prefixes: the element's own, then attribute prefixes.
    let mut utilized: BTreeSet<&str> = BTreeSet::new();
    utilized.insert(element.prefix().unwrap_or(""));
    for name in element.attributes().keys() {
        if is_namespace_attribute(name) {
            continue;
        }
        check_name(name)?;
        if let (Some(prefix), _) = split_qname(name) {
            utilized.insert(prefix);
        }
    }

    let mut declarations: BTreeMap<String, String> = BTreeMap::new();
    for prefix in utilized {
        if prefix == XML_PREFIX {
            continue;
        }
        if prefix.is_empty() {
            let uri = scope.default_namespace().unwrap_or("");
            let current = rendered.get("").map(String::as_str).unwrap_or("");
            if current != uri {
                declarations.insert(String::new(), uri.to_string());
            }
            continue;
        }
        let uri = scope
            .resolve(prefix)
            .ok_or_else(|| CanonicalizationError::UnresolvedPrefix {
                element: element.name().to_string(),
                prefix: prefix.to_string(),
            })?;
        if rendered.get(prefix).map(String::as_str) != Some(uri) {
            declarations.insert(prefix.to_string(), uri.to_string());
        }
    }

    let mut attributes = Vec::with_capacity(element.attributes().len());
    for (qname, value) in element.attributes() {
        if is_namespace_attribute(qname) {
            continue;
        }
        let (prefix, local) = split_qname(qname);
        let uri = match prefix {
            None => "",
            Some(XML_PREFIX) => XML_NAMESPACE,
            Some(p) => scope
                .resolve(p)
                .ok_or_else(|| CanonicalizationError::UnresolvedPrefix {
                    element: element.name().to_string(),
                    prefix: p.to_string(),
                })?,
        };
        attributes.push(SortedAttribute {
            uri,
            local,
            qname,
            value,
        });
    }
    attributes.sort_by(|a, b| (a.uri, a.local).cmp(&(b.uri, b.local)));

    out.push('<');
    out.push_str(element.name());
    for (prefix, uri) in &declarations {
        if prefix.is_empty() {
            out.push_str(" xmlns=\"");
        } else {
            out.push_str(" xmlns:");
            out.push_str(prefix);
            out.push_str("=\"");
        }
        out.push_str(&escape_attribute(uri));
        out.push('"');
    }
    for attr in &attributes {
        out.push(' ');
        out.push_str(attr.qname);
        out.push_str("=\"");
        out.push_str(&escape_attribute(attr.value));
        out.push('"');
    }
    out.push('>');

    if !element.children().is_empty() {
        let mut child_rendered;
        let child_rendered_ref = if declarations.is_empty() {
            rendered
        } else {
            child_rendered = rendered.clone();
            child_rendered.extend(declarations);
            &child_rendered
        };
        for child in element.children() {
            match child {
                Node::Text(text) => out.push_str(&escape_text(text)),
                Node::Element(e) => render(e, &scope, child_rendered_ref, out)?,
            }
        }
    }

    out.push_str("</");
    out.push_str(element.name());
    out.push('>');
    Ok(())
}
