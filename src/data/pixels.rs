//! Single-plane pixel storage.

use ndarray::{Array2, ArrayView2};

/// A 2D grid of pixel intensities, indexed `[row, column]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelGrid {
    pixels: Array2<f32>,
}

impl PixelGrid {
    pub fn new(pixels: Array2<f32>) -> Self {
        Self { pixels }
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.pixels.view()
    }

    pub fn into_inner(self) -> Array2<f32> {
        self.pixels
    }

    /// Smallest and largest finite value, if any.
    pub fn range(&self) -> Option<(f32, f32)> {
        self.pixels
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Rescale to `[0, 1]` by `(p - min) / (max - min)`.
    ///
    /// A constant image has no range to stretch and comes out all zeros.
    pub fn normalized(self) -> Self {
        let Some((lo, hi)) = self.range() else {
            log::warn!("Image has no finite pixel values");
            return Self::new(self.pixels.mapv(|_| 0.0));
        };

        let span = hi - lo;
        if span <= 0.0 {
            log::debug!("Constant image (value {}), normalizing to zeros", lo);
            return Self::new(self.pixels.mapv(|_| 0.0));
        }

        Self::new(self.pixels.mapv(|v| (v - lo) / span))
    }
}

impl From<Array2<f32>> for PixelGrid {
    fn from(pixels: Array2<f32>) -> Self {
        Self::new(pixels)
    }
}
