//! Markings persistence.
//!
//! This module provides the [`AnnotationMap`] that a session fills in and the
//! JSON file format it is saved to and resumed from.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use roimark::format::{AnnotationMap, ExportOptions};
//! use roimark::model::ShapeKind;
//!
//! let map = AnnotationMap::load(Path::new("markings.json"), ShapeKind::Box)?;
//! map.export(Some(Path::new("out.json")), &ExportOptions::new().relative_to("/data"))?;
//! ```

mod error;
mod markings;
mod options;
pub mod paths;

#[cfg(test)]
mod tests;

pub use error::FormatError;
pub use markings::AnnotationMap;
pub use options::{ExportOptions, ImportOptions, LegacyKeyPolicy};
