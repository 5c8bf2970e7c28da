//! The annotation map and its JSON markings file.
//!
//! A markings file is a single JSON object mapping image identifiers to lists
//! of 4-number arrays:
//!
//! ```json
//! {"/data/a.tif": [[10, 10, 40, 30]], "/data/b.tif": []}
//! ```
//!
//! Boxes are `[x, y, width, height]` and arrows `[x1, y1, x2, y2]`. The file
//! does not say which, so loading needs the session's [`ShapeKind`].

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::Path;

use serde::Serialize;

use crate::format::error::FormatError;
use crate::format::options::{ExportOptions, ImportOptions, LegacyKeyPolicy};
use crate::format::paths::{normalize_lexically, parent_key, path_key, relative_to};
use crate::model::{Roi, ShapeKind};

/// Mapping from image identifier to the ROIs selected on it, in selection
/// order.
///
/// An identifier present with an empty list was visited without selections;
/// presence alone marks an image as already annotated.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AnnotationMap {
    entries: BTreeMap<String, Vec<Roi>>,
}

impl AnnotationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identifiers in the map.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map has no identifiers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if an identifier has an entry (possibly empty).
    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    /// Get the ROIs of an identifier.
    pub fn get(&self, identifier: &str) -> Option<&[Roi]> {
        self.entries.get(identifier).map(Vec::as_slice)
    }

    /// Iterate over identifiers and their ROI lists, ordered by identifier.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Roi])> {
        self.entries
            .iter()
            .map(|(key, rois)| (key.as_str(), rois.as_slice()))
    }

    /// Total ROI count across all identifiers.
    pub fn total_rois(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Replace the list of an identifier.
    pub fn insert(&mut self, identifier: impl Into<String>, rois: Vec<Roi>) {
        self.entries.insert(identifier.into(), rois);
    }

    /// Start an identifier over with an empty list, discarding stale entries.
    pub fn reset(&mut self, identifier: &str) {
        self.entries.insert(identifier.to_string(), Vec::new());
    }

    /// Append an ROI to an identifier's list, creating the entry if needed.
    pub fn push(&mut self, identifier: &str, roi: Roi) {
        self.entries
            .entry(identifier.to_string())
            .or_default()
            .push(roi);
    }

    /// Remove and return the most recent ROI of an identifier.
    pub fn pop(&mut self, identifier: &str) -> Option<Roi> {
        self.entries.get_mut(identifier)?.pop()
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// View with every identifier rewritten relative to `base`.
    ///
    /// Identifiers that cannot be expressed relative to `base` keep their
    /// original form. Two identifiers landing on the same key are logged as
    /// an error and their lists are concatenated.
    pub fn relativize(&self, base: &Path) -> AnnotationMap {
        let mut view = AnnotationMap::new();
        for (key, rois) in &self.entries {
            let rel = match relative_to(Path::new(key), base) {
                Some(rel) => path_key(&rel),
                None => {
                    log::warn!("Cannot express {:?} relative to {:?}, keeping it as is", key, base);
                    key.clone()
                }
            };
            match view.entries.entry(rel) {
                Entry::Vacant(slot) => {
                    slot.insert(rois.clone());
                }
                Entry::Occupied(mut slot) => {
                    log::error!(
                        "{:?} maps onto the existing key {:?} relative to {:?}, merging their ROIs",
                        key,
                        slot.key(),
                        base
                    );
                    slot.get_mut().extend(rois.iter().copied());
                }
            }
        }
        view
    }

    /// View keyed by each identifier's parent directory.
    ///
    /// Lists of identifiers sharing a directory are concatenated in
    /// identifier order.
    pub fn drop_identifier(&self) -> AnnotationMap {
        let mut view = AnnotationMap::new();
        for (key, rois) in &self.entries {
            view.entries
                .entry(parent_key(key))
                .or_default()
                .extend(rois.iter().copied());
        }
        view
    }

    /// Rejoin relative identifiers with `base`.
    ///
    /// Absolute identifiers are handled according to `policy`.
    pub fn absolutize(self, base: &Path, policy: LegacyKeyPolicy) -> AnnotationMap {
        let mut out = AnnotationMap::new();
        let mut dropped = 0usize;

        for (key, rois) in self.entries {
            let path = Path::new(&key);
            if path.is_absolute() {
                match policy {
                    LegacyKeyPolicy::DropAbsolute => dropped += 1,
                    LegacyKeyPolicy::KeepAbsolute => {
                        out.entries.entry(key).or_default().extend(rois);
                    }
                }
                continue;
            }
            let joined = path_key(&normalize_lexically(&base.join(path)));
            out.entries.entry(joined).or_default().extend(rois);
        }

        if dropped > 0 {
            log::warn!(
                "Dropped {} absolute identifier(s) while loading markings relative to {:?}",
                dropped,
                base
            );
        }
        out
    }

    /// Apply export options, producing the map as it will be written.
    pub fn export_view(&self, options: &ExportOptions) -> AnnotationMap {
        let mut view = match &options.relative_to {
            Some(base) => self.relativize(base),
            None => self.clone(),
        };
        if options.drop_identifier {
            view = view.drop_identifier();
        }
        view
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Serialize to a compact JSON string.
    pub fn to_json(&self) -> Result<String, FormatError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a JSON markings document holding ROIs of the given kind.
    pub fn from_json(json: &str, kind: ShapeKind) -> Result<Self, FormatError> {
        let raw: BTreeMap<String, Vec<[f64; 4]>> = serde_json::from_str(json)?;

        let mut map = AnnotationMap::new();
        for (key, lists) in raw {
            if key.is_empty() {
                return Err(FormatError::invalid_format("empty image identifier"));
            }
            let rois = lists
                .into_iter()
                .map(|values| Roi::from_values(kind, values))
                .collect::<Result<Vec<_>, _>>()?;
            map.entries.insert(key, rois);
        }
        Ok(map)
    }

    /// Load a markings file.
    pub fn load(path: &Path, kind: ShapeKind) -> Result<Self, FormatError> {
        let json = std::fs::read_to_string(path)?;
        let map = Self::from_json(&json, kind)?;
        log::info!(
            "Loaded markings for {} images ({} ROIs) from {:?}",
            map.len(),
            map.total_rois(),
            path
        );
        Ok(map)
    }

    /// Load a markings file and apply import options.
    pub fn import(path: &Path, kind: ShapeKind, options: &ImportOptions) -> Result<Self, FormatError> {
        let map = Self::load(path, kind)?;
        Ok(match &options.relative_to {
            Some(base) => map.absolutize(base, options.legacy_keys),
            None => map,
        })
    }

    /// Write the map to a file, overwriting it.
    pub fn save(&self, path: &Path) -> Result<(), FormatError> {
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!(
            "Saved markings for {} images ({} ROIs) to {:?}",
            self.len(),
            self.total_rois(),
            path
        );
        Ok(())
    }

    /// Export to `destination` with the given options.
    ///
    /// Does nothing without a destination. Returns whether a file was written.
    pub fn export(
        &self,
        destination: Option<&Path>,
        options: &ExportOptions,
    ) -> Result<bool, FormatError> {
        let Some(path) = destination else {
            log::debug!("No markings destination configured, skipping save");
            return Ok(false);
        };
        self.export_view(options).save(path)?;
        Ok(true)
    }
}

impl FromIterator<(String, Vec<Roi>)> for AnnotationMap {
    fn from_iter<I: IntoIterator<Item = (String, Vec<Roi>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
