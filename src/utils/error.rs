//! Error types for the image converter.
//!
//! Provides a hierarchy of error types using `thiserror` for ergonomic error handling.

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use serde::Serialize;

/// Validation errors for settings and input paths.
#[derive(Error, Debug, Serialize, Clone, PartialEq)]
pub enum ValidationError {
    /// Path-related validation error
    #[error("Path error: {0}")]
    Path(#[from] PathError),
    /// Invalid settings error
    #[error("Settings error: {0}")]
    Settings(String),
}

/// File path errors.
#[derive(Error, Debug, Serialize, Clone, PartialEq)]
pub enum PathError {
    /// File does not exist
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    /// Path exists but is not a file
    #[error("Not a file: {0}")]
    NotFile(PathBuf),
    /// IO error accessing the path
    #[error("IO error: {0}")]
    IO(String),
}

/// Main error type for the converter.
///
/// Conversion failures (`DecodeFailed`, `SurfaceUnavailable`, `EncodeFailed`)
/// are per-entry and never abort a batch.
#[derive(Error, Debug, Serialize, Clone, PartialEq)]
pub enum ConverterError {
    /// Settings or input validation failed
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Source bytes could not be decoded into an image
    #[error("Decode failed: {0}")]
    DecodeFailed(String),

    /// A pixel surface of the requested size could not be created
    #[error("Surface unavailable: {0}")]
    SurfaceUnavailable(String),

    /// Both the binary and the data-URL export paths failed
    #[error("Encode failed: {0}")]
    EncodeFailed(String),

    /// A batch is already running
    #[error("A batch is already being processed")]
    BatchInProgress,

    /// Building the download archive failed
    #[error("Archive error: {0}")]
    Archive(String),

    /// File IO error
    #[error("IO error: {0}")]
    IO(String),

    /// Unexpected processing failure (e.g. a panicked blocking task)
    #[error("Processing error: {0}")]
    Processing(String),
}

/// Convenience result type for converter operations.
pub type ConverterResult<T> = Result<T, ConverterError>;

// Helper methods for error creation
impl ConverterError {
    pub fn decode<T: Into<String>>(msg: T) -> Self {
        Self::DecodeFailed(msg.into())
    }

    pub fn surface<T: Into<String>>(msg: T) -> Self {
        Self::SurfaceUnavailable(msg.into())
    }

    pub fn encode<T: Into<String>>(msg: T) -> Self {
        Self::EncodeFailed(msg.into())
    }

    pub fn archive<T: Into<String>>(msg: T) -> Self {
        Self::Archive(msg.into())
    }

    pub fn processing<T: Into<String>>(msg: T) -> Self {
        Self::Processing(msg.into())
    }

    pub fn settings<T: Into<String>>(msg: T) -> Self {
        Self::Validation(ValidationError::settings(msg))
    }
}

// Helper methods for validation error creation
impl ValidationError {
    pub fn path_not_found(path: impl Into<PathBuf>) -> Self {
        Self::Path(PathError::NotFound(path.into()))
    }

    pub fn not_a_file(path: impl Into<PathBuf>) -> Self {
        Self::Path(PathError::NotFile(path.into()))
    }

    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }
}

// Convert std::io::Error to ConverterError
impl From<io::Error> for ConverterError {
    fn from(err: io::Error) -> Self {
        Self::IO(err.to_string())
    }
}

// Convert io::Error to PathError
impl From<io::Error> for PathError {
    fn from(err: io::Error) -> Self {
        Self::IO(err.to_string())
    }
}

// Convert PathError to ConverterError
impl From<PathError> for ConverterError {
    fn from(err: PathError) -> Self {
        Self::Validation(ValidationError::Path(err))
    }
}

impl From<zip::result::ZipError> for ConverterError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}
