//! Options controlling how markings are exported and imported.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What to do with absolute identifiers found in a file loaded with a
/// relative base directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyKeyPolicy {
    /// Drop them; only relative-form entries are rejoined with the base.
    #[default]
    DropAbsolute,
    /// Keep them unchanged next to the rejoined relative entries.
    KeepAbsolute,
}

/// Options for export (save) operations.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Write identifiers relative to this directory instead of as given.
    pub relative_to: Option<PathBuf>,

    /// Key each ROI list by the identifier's parent directory.
    pub drop_identifier: bool,
}

impl ExportOptions {
    /// Create new export options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set base path for relative identifiers.
    pub fn relative_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.relative_to = Some(path.into());
        self
    }

    /// Key lists by parent directory.
    pub fn drop_identifier(mut self, drop: bool) -> Self {
        self.drop_identifier = drop;
        self
    }

    /// Whether exporting with these options changes the map at all.
    pub fn is_identity(&self) -> bool {
        self.relative_to.is_none() && !self.drop_identifier
    }
}

/// Options for import (load) operations.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Base path to rejoin relative identifiers with.
    pub relative_to: Option<PathBuf>,

    /// Handling of absolute identifiers when `relative_to` is set.
    pub legacy_keys: LegacyKeyPolicy,
}

impl ImportOptions {
    /// Create new import options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set base path for resolving relative identifiers.
    pub fn relative_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.relative_to = Some(path.into());
        self
    }

    /// Set the policy for absolute identifiers.
    pub fn legacy_keys(mut self, policy: LegacyKeyPolicy) -> Self {
        self.legacy_keys = policy;
        self
    }
}
