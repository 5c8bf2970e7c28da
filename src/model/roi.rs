//! ROI shape types and data structures.

use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ConfigError;
use crate::format::FormatError;

/// A 2D point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// The shape drawn for every ROI of a session.
///
/// Chosen once when the session is configured. The persisted file carries no
/// shape tag, so the same kind must be supplied when markings are reloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Axis-aligned rectangle stored as `[x, y, width, height]`.
    #[default]
    Box,
    /// Directed arrow stored as `[x1, y1, x2, y2]` (tail to head).
    Arrow,
}

impl ShapeKind {
    /// Get the configuration name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Box => "box",
            ShapeKind::Arrow => "arrow",
        }
    }

    /// Whether selections of this kind leave a highlight overlay behind.
    pub fn keeps_highlight(&self) -> bool {
        matches!(self, ShapeKind::Box)
    }
}

impl FromStr for ShapeKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "box" => Ok(ShapeKind::Box),
            "arrow" => Ok(ShapeKind::Arrow),
            other => Err(ConfigError::InvalidShapeKind(other.to_string())),
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A region of interest on one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Roi {
    /// Bounding box defined by its top-left corner and size, in whole pixels.
    Box {
        x: i64,
        y: i64,
        width: i64,
        height: i64,
    },
    /// Arrow from `(x1, y1)` to `(x2, y2)`.
    Arrow { x1: f64, y1: f64, x2: f64, y2: f64 },
}

impl Roi {
    /// The shape kind of this ROI.
    pub fn kind(&self) -> ShapeKind {
        match self {
            Roi::Box { .. } => ShapeKind::Box,
            Roi::Arrow { .. } => ShapeKind::Arrow,
        }
    }

    /// The four persisted numbers of this ROI.
    pub fn values(&self) -> [f64; 4] {
        match *self {
            Roi::Box {
                x,
                y,
                width,
                height,
            } => [x as f64, y as f64, width as f64, height as f64],
            Roi::Arrow { x1, y1, x2, y2 } => [x1, y1, x2, y2],
        }
    }

    /// Rebuild an ROI from its four persisted numbers.
    ///
    /// Box values are floored to whole pixels and must have a non-negative
    /// width and height.
    pub fn from_values(kind: ShapeKind, values: [f64; 4]) -> Result<Self, FormatError> {
        if values.iter().any(|v| !v.is_finite()) {
            return Err(FormatError::invalid_coordinates(format!(
                "non-finite value in {:?}",
                values
            )));
        }

        match kind {
            ShapeKind::Box => {
                let [x, y, width, height] = values.map(|v| v.floor() as i64);
                if width < 0 || height < 0 {
                    return Err(FormatError::invalid_coordinates(format!(
                        "negative box size {}x{}",
                        width, height
                    )));
                }
                Ok(Roi::Box {
                    x,
                    y,
                    width,
                    height,
                })
            }
            ShapeKind::Arrow => {
                let [x1, y1, x2, y2] = values;
                Ok(Roi::Arrow { x1, y1, x2, y2 })
            }
        }
    }

    /// Check whether the ROI lies inside an image of the given size.
    pub fn fits_within(&self, width: usize, height: usize) -> bool {
        let (w, h) = (width as f64, height as f64);
        let inside = |x: f64, y: f64| (0.0..=w).contains(&x) && (0.0..=h).contains(&y);
        match *self {
            Roi::Box {
                x,
                y,
                width,
                height,
            } => inside(x as f64, y as f64) && inside((x + width) as f64, (y + height) as f64),
            Roi::Arrow { x1, y1, x2, y2 } => inside(x1, y1) && inside(x2, y2),
        }
    }
}

impl Serialize for Roi {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(4)?;
        match *self {
            Roi::Box {
                x,
                y,
                width,
                height,
            } => {
                for value in [x, y, width, height] {
                    tuple.serialize_element(&value)?;
                }
            }
            Roi::Arrow { x1, y1, x2, y2 } => {
                for value in [x1, y1, x2, y2] {
                    tuple.serialize_element(&value)?;
                }
            }
        }
        tuple.end()
    }
}

/// Display-only viewport for one image.
///
/// Restricts what the presenter shows; stored ROIs stay in full-image pixel
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropWindow {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropWindow {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Horizontal viewport bounds `(left, right)`.
    pub fn x_bounds(&self) -> (f64, f64) {
        (self.x, self.x + self.width)
    }

    /// Vertical viewport bounds `(top, bottom)`.
    pub fn y_bounds(&self) -> (f64, f64) {
        (self.y, self.y + self.height)
    }
}
