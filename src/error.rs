//! Error types for session setup and execution.

use std::path::PathBuf;

use thiserror::Error;

use crate::data::DecodeError;
use crate::format::FormatError;

/// Errors raised while building a session or loading preferences.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Shape kind string other than "box" or "arrow"
    #[error("Selection type has to be \"box\" or \"arrow\", not \"{0}\"")]
    InvalidShapeKind(String),

    /// Relativization base is not an existing directory
    #[error("Invalid base directory for relative identifiers: {path:?}")]
    InvalidBaseDirectory {
        /// The rejected directory
        path: PathBuf,
    },

    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that end an annotation session.
///
/// None of these are retried; they propagate to whoever drives the session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Format(#[from] FormatError),
}
