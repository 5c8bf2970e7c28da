//! Loader for NumPy `.npy` files.
//!
//! **Expected array shapes** (`[row, column]` convention):
//! - 2D `(H, W)`: a single plane
//! - 3D `(N, H, W)`: a stack of planes, of which the first is used

use std::io::Cursor;

use ndarray::{ArrayD, Axis, Ix2};
use ndarray_npy::{ReadNpyExt, ReadableElement};

use crate::data::PixelGrid;
use crate::data::loader::{DecodeError, PlaneLoader};

/// Loader for NumPy `.npy` files.
///
/// Supported data types: `f32`, `f64`, `u8`, `u16`, `i16`, `i32`. Values are
/// kept as they are; the session normalises the plane afterwards.
pub struct NpyLoader;

impl NpyLoader {
    /// NumPy magic bytes: \x93NUMPY
    const MAGIC: &'static [u8] = &[0x93, b'N', b'U', b'M', b'P', b'Y'];

    /// Try reading the array as element type `T`.
    fn read_as<T>(data: &[u8]) -> Option<ArrayD<T>>
    where
        T: ReadableElement,
    {
        ArrayD::<T>::read_npy(Cursor::new(data)).ok()
    }

    /// Select the first 2D plane of the array.
    fn first_plane<T>(array: ArrayD<T>) -> Result<PixelGrid, DecodeError>
    where
        T: RawValue + Copy,
    {
        let shape = array.shape().to_vec();
        log::debug!("NpyLoader: array shape = {:?}", shape);

        let plane = match shape.len() {
            2 => array.view(),
            3 if shape[0] > 0 => array.index_axis(Axis(0), 0),
            3 => return Err(DecodeError::new("Empty 3D stack")),
            n => {
                return Err(DecodeError::new(format!(
                    "Unsupported array dimensions: {} (expected 2 or 3)",
                    n
                )));
            }
        };

        let plane = plane
            .into_dimensionality::<Ix2>()
            .map_err(|e| DecodeError::new(format!("Cannot view plane as 2D: {}", e)))?;

        Ok(PixelGrid::new(plane.mapv(RawValue::to_f32)))
    }
}

impl PlaneLoader for NpyLoader {
    fn id(&self) -> &'static str {
        "npy"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["npy"]
    }

    fn can_load(&self, data: &[u8]) -> bool {
        data.starts_with(Self::MAGIC)
    }

    fn load(&self, data: &[u8]) -> Result<PixelGrid, DecodeError> {
        // f32 is most common for scientific data
        if let Some(array) = Self::read_as::<f32>(data) {
            return Self::first_plane(array);
        }
        if let Some(array) = Self::read_as::<f64>(data) {
            return Self::first_plane(array);
        }
        if let Some(array) = Self::read_as::<u16>(data) {
            return Self::first_plane(array);
        }
        if let Some(array) = Self::read_as::<u8>(data) {
            return Self::first_plane(array);
        }
        if let Some(array) = Self::read_as::<i16>(data) {
            return Self::first_plane(array);
        }
        if let Some(array) = Self::read_as::<i32>(data) {
            return Self::first_plane(array);
        }

        Err(DecodeError::new(
            "Failed to read NumPy array: unsupported dtype or invalid format",
        ))
    }

    fn priority(&self) -> i32 {
        10
    }
}

/// Lossy conversion of stored element types to `f32`.
trait RawValue {
    fn to_f32(self) -> f32;
}

impl RawValue for f32 {
    fn to_f32(self) -> f32 {
        self
    }
}

impl RawValue for f64 {
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl RawValue for u8 {
    fn to_f32(self) -> f32 {
        f32::from(self)
    }
}

impl RawValue for u16 {
    fn to_f32(self) -> f32 {
        f32::from(self)
    }
}

impl RawValue for i16 {
    fn to_f32(self) -> f32 {
        f32::from(self)
    }
}

impl RawValue for i32 {
    fn to_f32(self) -> f32 {
        self as f32
    }
}
