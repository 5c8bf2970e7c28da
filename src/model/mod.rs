//! Data models for ROI annotations.

mod geometry;
mod roi;

pub use geometry::normalize;
pub use roi::{CropWindow, Point, Roi, ShapeKind};
