//! Pixel data and image decoders.
//!
//! This module provides:
//! - `PixelGrid`: a single 2D plane of intensities
//! - `ImageDecoder`: the seam a session uses to read images
//! - `LoaderRegistry`: the file-backed decoder, built from `PlaneLoader`s for
//!   standard images (PNG, JPEG, TIFF, ...) and NumPy (.npy) files
//!
//! ## Adding New Formats
//!
//! 1. Create a new loader in `loaders/` implementing `PlaneLoader`
//! 2. Register it in `LoaderRegistry::new()`
//!
//! ```rust,ignore
//! use roimark::data::{PlaneLoader, DecodeError, PixelGrid};
//!
//! pub struct MyFormatLoader;
//!
//! impl PlaneLoader for MyFormatLoader {
//!     fn id(&self) -> &'static str { "myformat" }
//!     fn extensions(&self) -> &'static [&'static str] { &["myf"] }
//!     fn can_load(&self, data: &[u8]) -> bool { /* check magic bytes */ }
//!     fn load(&self, data: &[u8]) -> Result<PixelGrid, DecodeError> { /* ... */ }
//! }
//! ```

mod loader;
pub mod loaders;
mod pixels;

pub use loader::{DecodeError, ImageDecoder, LoaderRegistry, PlaneLoader};
pub use pixels::PixelGrid;
