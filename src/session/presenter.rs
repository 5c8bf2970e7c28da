//! Display requests issued by a session.

use std::path::Path;

use ndarray::ArrayView2;

use crate::model::{CropWindow, Roi};
use crate::selection::Preview;

/// Receiver of a session's display requests.
///
/// Every method defaults to doing nothing, so a host implements only what it
/// can show.
pub trait Presenter {
    /// Redraw the image. Values are scaled so `vmin` is black and `vmax` white.
    fn show_image(&mut self, _image: ArrayView2<'_, f32>, _vmin: f32, _vmax: f32) {}

    /// Show the identifier of the current image.
    fn set_title(&mut self, _title: &str) {}

    /// Restrict the view to a crop window.
    fn set_viewport(&mut self, _crop: CropWindow) {}

    /// Draw, replace or clear (`None`) the in-progress gesture preview.
    fn show_preview(&mut self, _preview: Option<&Preview>) {}

    /// Overlay a finished selection.
    fn add_highlight(&mut self, _roi: &Roi) {}

    /// Remove the most recent overlay.
    fn remove_last_highlight(&mut self) {}

    /// Remove every overlay.
    fn clear_highlights(&mut self) {}

    /// All images are done and markings were saved to `destination`.
    fn notify_complete(&mut self, _destination: Option<&Path>) {}
}

/// Presenter that ignores every request, for headless sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {}
