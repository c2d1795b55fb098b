//! # Document Tree
//!
//! The in-memory model of a business document: an ordered tree of elements,
//! each with an attribute map, local namespace declarations and ordered
//! children (elements or text).
//!
//! Attributes and namespace declarations live in `BTreeMap`s, so insertion
//! order never leaks into the canonical form. Child order is significant and
//! preserved exactly.
//!
//! [`Document`] wraps the signable root and guarantees it carries a
//! non-empty identifier attribute. Signing consumes the `Document`; the
//! signed form is a distinct type in `edoc-crypto` with no mutators.

use std::collections::BTreeMap;

use crate::canonical::CanonicalBytes;
use crate::error::{CanonicalizationError, DocumentError};

/// Name of the identifier attribute on the signable root.
pub const ID_ATTRIBUTE: &str = "Id";

/// A child node of an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A nested element.
    Element(Element),
    /// Character data, stored unescaped.
    Text(String),
}

impl Node {
    /// Borrow the element if this node is one.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        }
    }

    /// Mutably borrow the element if this node is one.
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        }
    }
}

/// A named node with attributes, namespace declarations and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    namespaces: BTreeMap<String, String>,
    attributes: BTreeMap<String, String>,
    children: Vec<Node>,
}

impl Element {
    /// Create an element with a qualified name (`local` or `prefix:local`).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespaces: BTreeMap::new(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    // -- Builder-style construction ------------------------------------------

    /// Declare the default namespace on this element.
    pub fn with_default_namespace(mut self, uri: impl Into<String>) -> Self {
        self.namespaces.insert(String::new(), uri.into());
        self
    }

    /// Declare a prefixed namespace on this element.
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    /// Set an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Append a child element.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Append a text node.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Shorthand for a leaf element holding only text.
    pub fn leaf(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name).with_text(text)
    }

    // -- Names -----------------------------------------------------------------

    /// The qualified name as written.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The prefix part of the qualified name, if any.
    pub fn prefix(&self) -> Option<&str> {
        split_qname(&self.name).0
    }

    /// The local part of the qualified name.
    pub fn local_name(&self) -> &str {
        split_qname(&self.name).1
    }

    // -- Attributes and namespaces ---------------------------------------------

    /// Look up an attribute by qualified name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// All attributes, keyed by qualified name.
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Set or replace an attribute.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        self.attributes.remove(name)
    }

    /// Namespace declarations made on this element (`""` is the default).
    pub fn namespaces(&self) -> &BTreeMap<String, String> {
        &self.namespaces
    }

    /// Add or replace a namespace declaration.
    pub fn declare_namespace(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.namespaces.insert(prefix.into(), uri.into());
    }

    // -- Children --------------------------------------------------------------

    /// All child nodes in document order.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Mutable access to the child list.
    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// Append a child node.
    pub fn push(&mut self, node: Node) {
        self.children.push(node);
    }

    /// Iterate over element children only.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Iterate mutably over element children only.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(Node::as_element_mut)
    }

    /// First element child with the given local name.
    pub fn child(&self, local: &str) -> Option<&Element> {
        self.elements().find(|e| e.local_name() == local)
    }

    /// First element child with the given local name, mutably.
    pub fn child_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.local_name() == local)
    }

    /// Index in `children()` of the first element child with this local name.
    pub fn child_position(&self, local: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|n| n.as_element().is_some_and(|e| e.local_name() == local))
    }

    /// The last element child, ignoring trailing text.
    pub fn last_element(&self) -> Option<&Element> {
        self.children.iter().rev().find_map(Node::as_element)
    }

    /// Concatenated direct text content.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![Node::Text(text.into())];
    }

    /// Remove whitespace-only text from this element (if it has element
    /// children) and from every descendant, matching what the parser keeps.
    pub fn strip_inter_element_whitespace(&mut self) {
        if self.elements().next().is_some() {
            self.children
                .retain(|n| !matches!(n, Node::Text(t) if t.trim().is_empty()));
        }
        for child in self.elements_mut() {
            child.strip_inter_element_whitespace();
        }
    }

    /// Depth-first pre-order traversal of this element and its descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// First descendant (including self) with the given local name.
    pub fn find(&self, local: &str) -> Option<&Element> {
        self.descendants().find(|e| e.local_name() == local)
    }

    /// First descendant (including self) with the given local name, mutably.
    pub fn find_mut(&mut self, local: &str) -> Option<&mut Element> {
        if self.local_name() == local {
            return Some(self);
        }
        self.elements_mut().find_map(|c| c.find_mut(local))
    }

    /// Canonicalize this element as a standalone subtree.
    pub fn canonicalize(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::of(self)
    }
}

/// Iterator returned by [`Element::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.elements().collect::<Vec<_>>().into_iter().rev());
        Some(next)
    }
}

/// Split `prefix:local` into its parts.
pub(crate) fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

/// An unsigned business document rooted at its signable root.
///
/// # Invariants
///
/// - The root carries a non-empty [`ID_ATTRIBUTE`].
/// - The tree may be edited freely until it is handed to the signer, which
///   consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Wrap a signable root, checking its identifier.
    pub fn new(root: Element) -> Result<Self, DocumentError> {
        check_identifier(&root)?;
        Ok(Self { root })
    }

    /// The signable root's identifier.
    pub fn id(&self) -> &str {
        self.root.attr(ID_ATTRIBUTE).unwrap_or_default()
    }

    /// Borrow the signable root.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Mutably borrow the signable root (pre-signature edits only).
    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Consume the document, re-checking the identifier after edits.
    pub fn into_root(self) -> Result<Element, DocumentError> {
        check_identifier(&self.root)?;
        Ok(self.root)
    }

    /// Canonical bytes of the whole document.
    pub fn canonicalize(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::of(&self.root)
    }
}

fn check_identifier(root: &Element) -> Result<(), DocumentError> {
    match root.attr(ID_ATTRIBUTE) {
        None => Err(DocumentError::MissingIdentifier {
            element: root.name().to_string(),
            attribute: ID_ATTRIBUTE.to_string(),
        }),
        Some(id) if id.trim().is_empty() => Err(DocumentError::EmptyIdentifier {
            element: root.name().to_string(),
        }),
        Some(_) => Ok(()),
    }
}
