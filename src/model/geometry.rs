//! Conversion of two pointer positions into a canonical ROI.

use super::roi::{Point, Roi, ShapeKind};

/// Build an ROI of the given kind from two arbitrary points.
///
/// Boxes are normalised so the corner is the element-wise minimum and the
/// size is never negative, all floored to whole pixels. Zero-area boxes are
/// returned as-is. Arrows keep the point order since direction matters.
pub fn normalize(kind: ShapeKind, p0: Point, p1: Point) -> Roi {
    match kind {
        ShapeKind::Box => Roi::Box {
            x: p0.x.min(p1.x).floor() as i64,
            y: p0.y.min(p1.y).floor() as i64,
            width: (p1.x - p0.x).abs().floor() as i64,
            height: (p1.y - p0.y).abs().floor() as i64,
        },
        ShapeKind::Arrow => Roi::Arrow {
            x1: p0.x,
            y1: p0.y,
            x2: p1.x,
            y2: p1.y,
        },
    }
}
