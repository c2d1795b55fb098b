//! Namespace scope tracking for prefix resolution.
//!
//! A [`NamespaceScope`] is the set of prefix bindings visible at a point in
//! the tree. Canonicalizing a subtree needs the bindings inherited from its
//! ancestors even though those ancestors are not part of the output.

use std::collections::BTreeMap;

use crate::document::Element;

/// The reserved `xml` prefix.
pub const XML_PREFIX: &str = "xml";

/// Namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Prefix bindings in effect at a point in a tree.
///
/// The empty prefix holds the default namespace; an empty URI for it means
/// "no default namespace". The `xml` prefix is always bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceScope {
    bindings: BTreeMap<String, String>,
}

impl NamespaceScope {
    /// An empty scope (only `xml` bound).
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope with the given default namespace.
    pub fn with_default(uri: impl Into<String>) -> Self {
        let mut scope = Self::new();
        scope.bindings.insert(String::new(), uri.into());
        scope
    }

    /// The scope seen by the children of `element`: this scope plus the
    /// declarations made on `element`.
    pub fn extended(&self, element: &Element) -> Self {
        if element.namespaces().is_empty() {
            return self.clone();
        }
        let mut next = self.clone();
        for (prefix, uri) in element.namespaces() {
            next.bindings.insert(prefix.clone(), uri.clone());
        }
        next
    }

    /// Build the scope in effect inside the last element of `path`, where
    /// `path` runs from the outermost ancestor down.
    pub fn along<'a>(path: impl IntoIterator<Item = &'a Element>) -> Self {
        path.into_iter()
            .fold(Self::new(), |scope, element| scope.extended(element))
    }

    /// Resolve a prefix. `""` resolves the default namespace and yields
    /// `None` when no (or an empty) default is in effect.
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == XML_PREFIX {
            return Some(XML_NAMESPACE);
        }
        match self.bindings.get(prefix) {
            Some(uri) if uri.is_empty() => None,
            Some(uri) => Some(uri.as_str()),
            None => None,
        }
    }

    /// The default namespace, if a non-empty one is in effect.
    pub fn default_namespace(&self) -> Option<&str> {
        self.resolve("")
    }
}
