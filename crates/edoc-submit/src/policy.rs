//! Response-code classification and the correction policy.
//!
//! Both load from YAML so code sets can be tuned without recompiling:
//!
//! ```yaml
//! max_attempts: 3
//! accepted: ["0260", "0300"]
//! correctable:
//!   "1313":
//!     insert_missing:
//!       parent: gDatGralOpe
//!       after: dFeEmiDE
//!       element: dIndPres
//!       default_value: "1"
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::correction::CorrectionAction;

/// Correction-loop cap when none is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// How a response code is treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Accepted,
    Correctable(CorrectionAction),
    Final,
}

/// Maps response codes to outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeTable {
    /// Codes meaning the document was accepted (or, for batches, received).
    #[serde(default = "default_accepted")]
    pub accepted: BTreeSet<String>,
    /// Codes with a known mechanical correction. Each action is a
    /// single-key map (`reorder: {...}`), not a YAML tag.
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub correctable: BTreeMap<String, CorrectionAction>,
}

fn default_accepted() -> BTreeSet<String> {
    ["0260", "0300"].into_iter().map(String::from).collect()
}

impl Default for CodeTable {
    fn default() -> Self {
        Self {
            accepted: default_accepted(),
            correctable: BTreeMap::new(),
        }
    }
}

impl CodeTable {
    /// Classify a code. Anything not listed is final.
    pub fn classify(&self, code: &str) -> Classification {
        let code = code.trim();
        if self.accepted.contains(code) {
            Classification::Accepted
        } else if let Some(action) = self.correctable.get(code) {
            Classification::Correctable(action.clone())
        } else {
            Classification::Final
        }
    }
}

/// Correction-loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionPolicy {
    /// Total attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(flatten)]
    pub codes: CodeTable,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl Default for CorrectionPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            codes: CodeTable::default(),
        }
    }
}

/// Errors loading a policy.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("failed to read policy {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid policy: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("code {0} is both accepted and correctable")]
    Overlap(String),
}

impl CorrectionPolicy {
    /// Parse a policy from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, PolicyError> {
        let policy: Self = serde_yaml::from_str(text)?;
        policy.check()?;
        Ok(policy)
    }

    /// Load a policy from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    fn check(&self) -> Result<(), PolicyError> {
        if self.max_attempts == 0 {
            return Err(PolicyError::ZeroAttempts);
        }
        if let Some(code) = self
            .codes
            .correctable
            .keys()
            .find(|c| self.codes.accepted.contains(*c))
        {
            return Err(PolicyError::Overlap(code.clone()));
        }
        Ok(())
    }
}
