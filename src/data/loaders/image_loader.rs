//! Loader for standard image formats (PNG, JPEG, BMP, TIFF, WebP).
//!
//! Colour images are reduced to luminance. For multi-page TIFFs only the first
//! page is decoded.

use ndarray::Array2;

use crate::data::PixelGrid;
use crate::data::loader::{DecodeError, PlaneLoader};

/// Loader for standard image formats.
pub struct ImageLoader;

impl PlaneLoader for ImageLoader {
    fn id(&self) -> &'static str {
        "image"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["png", "jpg", "jpeg", "bmp", "tiff", "tif", "webp"]
    }

    fn can_load(&self, data: &[u8]) -> bool {
        if data.len() < 8 {
            return false;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return true;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return true;
        }

        // BMP: 42 4D (BM)
        if data.starts_with(&[0x42, 0x4D]) {
            return true;
        }

        // TIFF: 49 49 2A 00 (little endian) or 4D 4D 00 2A (big endian)
        if data.starts_with(&[0x49, 0x49, 0x2A, 0x00])
            || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
        {
            return true;
        }

        // WebP: RIFF....WEBP
        data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP"
    }

    fn load(&self, data: &[u8]) -> Result<PixelGrid, DecodeError> {
        let img = image::load_from_memory(data)
            .map_err(|e| DecodeError::new(format!("Failed to decode image: {}", e)))?
            .to_luma32f();

        let width = img.width() as usize;
        let height = img.height() as usize;

        let pixels = Array2::from_shape_vec((height, width), img.into_raw())
            .map_err(|e| DecodeError::new(format!("Unexpected pixel buffer size: {}", e)))?;

        log::trace!("ImageLoader: decoded {}x{} luminance plane", width, height);

        Ok(PixelGrid::new(pixels))
    }
}
