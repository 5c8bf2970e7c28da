//! Trait-based image decoding.
//!
//! A session reads images through the [`ImageDecoder`] trait. The file-backed
//! implementation is [`LoaderRegistry`], which picks a [`PlaneLoader`] for each
//! file by extension first and magic bytes second.
//!
//! ## Supported Formats
//!
//! - **Standard Images**: PNG, JPEG, BMP, TIFF (first page), WebP
//! - **NumPy Arrays**: `.npy` files with 2D arrays or 3D stacks (first plane)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use roimark::data::{ImageDecoder, LoaderRegistry};
//!
//! let registry = LoaderRegistry::new();
//! let grid = registry.decode(Path::new("stack.tif"))?;
//! ```

use std::path::{Path, PathBuf};

use crate::data::PixelGrid;

/// Error raised when an image cannot be read or decoded.
#[derive(Debug, Clone)]
pub struct DecodeError {
    /// Human-readable error message.
    pub message: String,
    /// The image that failed (if known).
    pub path: Option<PathBuf>,
    /// The loader that produced this error (if known).
    pub loader_id: Option<&'static str>,
}

impl DecodeError {
    /// Create a new decode error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            loader_id: None,
        }
    }

    /// Attach the path of the failing image.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Create an error with loader context.
    pub fn with_loader(mut self, loader_id: &'static str) -> Self {
        self.loader_id = Some(loader_id);
        self
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cannot read ")?;
        match &self.path {
            Some(path) => write!(f, "{}", path.display())?,
            None => write!(f, "image")?,
        }
        if let Some(loader) = self.loader_id {
            write!(f, " [{}]", loader)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for DecodeError {}

impl From<String> for DecodeError {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for DecodeError {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Source of pixel data for a session.
///
/// Implementations return the raw first plane of the image; the session
/// normalises it.
pub trait ImageDecoder {
    /// Decode the image stored at `path`.
    fn decode(&self, path: &Path) -> Result<PixelGrid, DecodeError>;
}

/// Decoder for one family of file formats.
pub trait PlaneLoader: Send + Sync {
    /// Unique identifier for this loader (e.g., "image", "npy").
    fn id(&self) -> &'static str;

    /// File extensions this loader handles (lowercase, without dots).
    fn extensions(&self) -> &'static [&'static str];

    /// Check magic bytes to see whether this loader can likely handle `data`.
    fn can_load(&self, data: &[u8]) -> bool;

    /// Decode the first plane from raw file bytes.
    fn load(&self, data: &[u8]) -> Result<PixelGrid, DecodeError>;

    /// Priority for format detection (higher = checked first).
    fn priority(&self) -> i32 {
        0
    }
}

/// Registry of available plane loaders.
pub struct LoaderRegistry {
    loaders: Vec<Box<dyn PlaneLoader>>,
}

impl LoaderRegistry {
    /// Create a new registry with all built-in loaders.
    pub fn new() -> Self {
        let mut registry = Self {
            loaders: Vec::new(),
        };
        registry.register(Box::new(super::loaders::ImageLoader));
        registry.register(Box::new(super::loaders::NpyLoader));
        registry
    }

    /// Register a new loader.
    pub fn register(&mut self, loader: Box<dyn PlaneLoader>) {
        self.loaders.push(loader);
        self.loaders.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// Decode raw bytes, choosing a loader by extension then by magic bytes.
    pub fn load_bytes(&self, data: &[u8], extension: Option<&str>) -> Result<PixelGrid, DecodeError> {
        let mut last_error = None;

        if let Some(ext) = extension.map(str::to_lowercase) {
            for loader in self
                .loaders
                .iter()
                .filter(|l| l.extensions().contains(&ext.as_str()))
            {
                match loader.load(data) {
                    Ok(grid) => {
                        log::debug!("Decoded with {} loader (by extension)", loader.id());
                        return Ok(grid);
                    }
                    Err(e) => {
                        log::trace!("Loader {} failed: {}", loader.id(), e);
                        last_error = Some(e.with_loader(loader.id()));
                    }
                }
            }
        }

        if let Some(loader) = self.loaders.iter().find(|l| l.can_load(data)) {
            match loader.load(data) {
                Ok(grid) => {
                    log::debug!("Decoded with {} loader (by detection)", loader.id());
                    return Ok(grid);
                }
                Err(e) => last_error = Some(e.with_loader(loader.id())),
            }
        }

        Err(last_error.unwrap_or_else(|| DecodeError::new("no loader recognises this file")))
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageDecoder for LoaderRegistry {
    fn decode(&self, path: &Path) -> Result<PixelGrid, DecodeError> {
        let data = std::fs::read(path)
            .map_err(|e| DecodeError::new(e.to_string()).with_path(path))?;
        let extension = path.extension().and_then(|e| e.to_str());

        let grid = self
            .load_bytes(&data, extension)
            .map_err(|e| e.with_path(path))?;
        log::debug!(
            "Decoded {:?}: {}x{} pixels",
            path,
            grid.width(),
            grid.height()
        );
        Ok(grid)
    }
}
