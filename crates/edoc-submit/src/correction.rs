//! Structural corrections applied to the unsigned document.
//!
//! Corrections are tree edits, never textual patches. The controller applies
//! every correction collected so far to a fresh clone of the unsigned
//! business document before each attempt, then re-signs.

use edoc_core::{truncate_subsecond, Element, Node};
use edoc_envelope::LocalCorrection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A mechanical fix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionAction {
    /// Insert `element` with `default_value` under `parent`, directly after
    /// the sibling `after` (or as the first child). No-op if present.
    InsertMissing {
        parent: String,
        #[serde(default)]
        after: Option<String>,
        element: String,
        default_value: String,
    },
    /// Ensure `first` precedes `second` among `parent`'s children.
    Reorder {
        parent: String,
        first: String,
        second: String,
    },
    /// Drop fractional seconds from every `element` timestamp.
    TruncateTimestamp { element: String },
}

/// Errors applying a correction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorrectionError {
    #[error("no <{0}> element to correct under")]
    ParentNotFound(String),
    #[error("<{parent}> has no <{sibling}> child")]
    SiblingNotFound { parent: String, sibling: String },
}

impl CorrectionAction {
    /// Apply to a document root. Returns whether the tree changed.
    pub fn apply(&self, root: &mut Element) -> Result<bool, CorrectionError> {
        match self {
            Self::InsertMissing {
                parent,
                after,
                element,
                default_value,
            } => {
                let target = root
                    .find_mut(parent)
                    .ok_or_else(|| CorrectionError::ParentNotFound(parent.clone()))?;
                if target.child(element).is_some() {
                    return Ok(false);
                }
                let position = match after {
                    Some(sibling) => {
                        target.child_position(sibling).ok_or_else(|| {
                            CorrectionError::SiblingNotFound {
                                parent: parent.clone(),
                                sibling: sibling.clone(),
                            }
                        })? + 1
                    }
                    None => 0,
                };
                target.children_mut().insert(
                    position,
                    Node::Element(Element::leaf(element.as_str(), default_value.as_str())),
                );
                Ok(true)
            }
            Self::Reorder {
                parent,
                first,
                second,
            } => {
                let target = root
                    .find_mut(parent)
                    .ok_or_else(|| CorrectionError::ParentNotFound(parent.clone()))?;
                let missing = |sibling: &String| CorrectionError::SiblingNotFound {
                    parent: parent.clone(),
                    sibling: sibling.clone(),
                };
                let from = target.child_position(first).ok_or_else(|| missing(first))?;
                let to = target.child_position(second).ok_or_else(|| missing(second))?;
                if from < to {
                    return Ok(false);
                }
                let node = target.children_mut().remove(from);
                target.children_mut().insert(to, node);
                Ok(true)
            }
            Self::TruncateTimestamp { element } => Ok(truncate_all(root, element)),
        }
    }
}

fn truncate_all(element: &mut Element, name: &str) -> bool {
    let mut changed = false;
    if element.local_name() == name {
        if let Some(truncated) = truncate_subsecond(&element.text()) {
            element.set_text(truncated);
            changed = true;
        }
    }
    for child in element.elements_mut() {
        changed |= truncate_all(child, name);
    }
    changed
}

impl From<LocalCorrection> for CorrectionAction {
    fn from(correction: LocalCorrection) -> Self {
        match correction {
            LocalCorrection::TruncateTimestamp { element } => Self::TruncateTimestamp { element },
        }
    }
}

impl std::fmt::Display for CorrectionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsertMissing {
                parent,
                element,
                default_value,
                ..
            } => write!(f, "insert <{element}>{default_value}</{element}> under <{parent}>"),
            Self::Reorder {
                parent,
                first,
                second,
            } => write!(f, "move <{first}> before <{second}> in <{parent}>"),
            Self::TruncateTimestamp { element } => {
                write!(f, "truncate <{element}> to whole seconds")
            }
        }
    }
}
