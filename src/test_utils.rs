//! Shared test utilities: a ramp image, an in-memory decoder and a presenter
//! that records every request it receives.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use ndarray::{Array2, ArrayView2};

use crate::data::{DecodeError, ImageDecoder, PixelGrid};
use crate::model::{CropWindow, Roi};
use crate::selection::Preview;
use crate::session::Presenter;

/// A `rows x cols` ramp image with values `0, 1, 2, ...`.
pub(crate) fn ramp(rows: usize, cols: usize) -> Array2<f32> {
    Array2::from_shape_fn((rows, cols), |(r, c)| (r * cols + c) as f32)
}

/// Decoder serving pixel grids from memory, failing for unknown paths.
#[derive(Default)]
pub(crate) struct MapDecoder {
    images: HashMap<PathBuf, Array2<f32>>,
    pub(crate) decoded: RefCell<Vec<PathBuf>>,
}

impl MapDecoder {
    pub(crate) fn with(mut self, path: impl Into<PathBuf>, pixels: Array2<f32>) -> Self {
        self.images.insert(path.into(), pixels);
        self
    }
}

impl ImageDecoder for MapDecoder {
    fn decode(&self, path: &Path) -> Result<PixelGrid, DecodeError> {
        self.decoded.borrow_mut().push(path.to_path_buf());
        self.images
            .get(path)
            .cloned()
            .map(PixelGrid::new)
            .ok_or_else(|| DecodeError::new("not in test decoder").with_path(path))
    }
}

/// Everything a [`RecordingPresenter`] was asked to do.
#[derive(Debug, Default)]
pub(crate) struct PresenterLog {
    pub(crate) images: Vec<Array2<f32>>,
    pub(crate) titles: Vec<String>,
    pub(crate) viewports: Vec<CropWindow>,
    pub(crate) previews: Vec<Option<Preview>>,
    pub(crate) highlights: Vec<Roi>,
    pub(crate) clears: usize,
    pub(crate) completions: Vec<Option<PathBuf>>,
}

/// Presenter that keeps the overlay stack and request history in a shared log.
#[derive(Clone, Default)]
pub(crate) struct RecordingPresenter {
    pub(crate) log: Rc<RefCell<PresenterLog>>,
}

impl Presenter for RecordingPresenter {
    fn show_image(&mut self, image: ArrayView2<'_, f32>, _vmin: f32, _vmax: f32) {
        self.log.borrow_mut().images.push(image.to_owned());
    }

    fn set_title(&mut self, title: &str) {
        self.log.borrow_mut().titles.push(title.to_string());
    }

    fn set_viewport(&mut self, crop: CropWindow) {
        self.log.borrow_mut().viewports.push(crop);
    }

    fn show_preview(&mut self, preview: Option<&Preview>) {
        self.log.borrow_mut().previews.push(preview.copied());
    }

    fn add_highlight(&mut self, roi: &Roi) {
        self.log.borrow_mut().highlights.push(*roi);
    }

    fn remove_last_highlight(&mut self) {
        self.log.borrow_mut().highlights.pop();
    }

    fn clear_highlights(&mut self) {
        let mut log = self.log.borrow_mut();
        log.highlights.clear();
        log.clears += 1;
    }

    fn notify_complete(&mut self, destination: Option<&Path>) {
        self.log
            .borrow_mut()
            .completions
            .push(destination.map(Path::to_path_buf));
    }
}
