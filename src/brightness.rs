//! Brightness window applied to normalised images before display.
//!
//! Both levels are multipliers of the mean intensity of the current image.
//! Rendering clips to `[mean * min_level, mean * max_level]` and stretches the
//! result back onto `[0, 1]`.

use ndarray::{Array2, ArrayView2};

use crate::constants::{DEFAULT_MAX_LEVEL_STEP, DEFAULT_MIN_LEVEL_STEP};

/// Direction of a brightness adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrightnessDirection {
    /// Lower the upper clip level (brighter image)
    MaxDown,
    /// Raise the upper clip level (darker image)
    MaxUp,
    /// Lower the lower clip level
    MinDown,
    /// Raise the lower clip level
    MinUp,
}

/// Adjustable clip levels for display rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct BrightnessWindow {
    min_level: f32,
    max_level: f32,
    max_step: f32,
    min_step: f32,
    clipping: bool,
}

impl Default for BrightnessWindow {
    fn default() -> Self {
        Self {
            min_level: 0.0,
            max_level: 1.0,
            max_step: DEFAULT_MAX_LEVEL_STEP,
            min_step: DEFAULT_MIN_LEVEL_STEP,
            clipping: true,
        }
    }
}

impl BrightnessWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use custom step sizes for the max and min levels.
    pub fn with_steps(mut self, max_step: f32, min_step: f32) -> Self {
        self.max_step = max_step;
        self.min_step = min_step;
        self
    }

    /// Enable or disable clipping. Without clipping, `render` is the identity.
    pub fn with_clipping(mut self, clipping: bool) -> Self {
        self.clipping = clipping;
        self
    }

    pub fn min_level(&self) -> f32 {
        self.min_level
    }

    pub fn max_level(&self) -> f32 {
        self.max_level
    }

    pub fn clipping(&self) -> bool {
        self.clipping
    }

    pub fn increase_max(&mut self) {
        self.max_level += self.max_step;
    }

    pub fn decrease_max(&mut self) {
        self.max_level -= self.max_step;
    }

    pub fn increase_min(&mut self) {
        self.min_level += self.min_step;
    }

    pub fn decrease_min(&mut self) {
        self.min_level -= self.min_step;
    }

    /// Apply one adjustment step.
    pub fn adjust(&mut self, direction: BrightnessDirection) {
        match direction {
            BrightnessDirection::MaxDown => self.decrease_max(),
            BrightnessDirection::MaxUp => self.increase_max(),
            BrightnessDirection::MinDown => self.decrease_min(),
            BrightnessDirection::MinUp => self.increase_min(),
        }
        log::debug!(
            "Brightness window {:?}: min_level={:.2}, max_level={:.2}",
            direction,
            self.min_level,
            self.max_level
        );
    }

    /// Render a normalised image through the window.
    ///
    /// If the clipped image is uniform (nothing left to stretch), or clipping
    /// is disabled, the input is returned unchanged.
    pub fn render(&self, image: ArrayView2<'_, f32>) -> Array2<f32> {
        if !self.clipping {
            return image.to_owned();
        }

        let Some(mean) = finite_mean(image) else {
            return image.to_owned();
        };

        let lo = mean * self.min_level;
        let hi = mean * self.max_level;

        // `f32::clamp` panics when lo > hi, so clip by hand
        let clipped = image.mapv(|v| v.max(lo).min(hi) - lo);

        let (low, high) = clipped
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(a, b), v| {
                (a.min(v), b.max(v))
            });

        if high <= 0.0 || high <= low || !high.is_finite() {
            log::trace!("Clipped image is flat, showing it unclipped");
            return image.to_owned();
        }

        clipped.mapv_into(|v| v / high)
    }
}

/// Mean of the finite pixel values, if there are any.
fn finite_mean(image: ArrayView2<'_, f32>) -> Option<f32> {
    let (sum, count) = image
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0f64, 0usize), |(sum, n), &v| (sum + f64::from(v), n + 1));

    (count > 0).then(|| (sum / count as f64) as f32)
}
