// SPDX-License-Identifier: GPL-3.0-only

//! Error types for depth capture

use crate::depth::Plane;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for DepthImage operations
pub type ImageResult<T> = Result<T, ImageError>;

/// Result type alias for frame source operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Result type alias for capture sessions
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Top-level error type used by the command line tool
#[derive(Debug, Clone)]
pub enum AppError {
    /// DepthImage errors
    Image(ImageError),
    /// Frame source errors
    Backend(BackendError),
    /// Capture session errors
    Capture(CaptureError),
    /// Export errors
    Export(ExportError),
    /// Configuration errors
    Config(String),
    /// Generic error with message
    Other(String),
}

/// DepthImage buffer and file format errors
#[derive(Debug, Clone, PartialEq)]
pub enum ImageError {
    /// Malformed or unsupported binary file (magic, type, version, contents)
    Format(String),
    /// A fill or accumulate received a buffer of the wrong size
    ShapeMismatch {
        plane: Plane,
        expected: usize,
        actual: usize,
    },
    /// Storage unavailable, unreadable or truncated
    Io(String),
}

/// Frame source errors
#[derive(Debug, Clone)]
pub enum BackendError {
    /// No usable source (no device, empty recording)
    DeviceUnavailable(String),
    /// A frame does not match the stream profile
    FormatMismatch(String),
    /// A recorded frame could not be loaded
    Image(ImageError),
}

/// Capture session errors
#[derive(Debug, Clone)]
pub enum CaptureError {
    /// The session output directory could not be created
    OutputDirectory(String),
    /// The frame source failed
    Source(BackendError),
    /// A frame could not be copied into the session buffers
    Image(ImageError),
    /// A required artifact could not be written
    Storage(String),
}

/// Export errors
#[derive(Debug, Clone)]
pub enum ExportError {
    /// No pixel carries a valid depth
    NoValidDepth,
    /// Image encoding failed
    Encoding(String),
    /// Point cloud writing failed
    PointCloud(String),
    /// Filesystem error
    Io(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Image(e) => write!(f, "Depth image error: {}", e),
            AppError::Backend(e) => write!(f, "Source error: {}", e),
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Export(e) => write!(f, "Export error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::Format(msg) => write!(f, "Invalid depth image file: {}", msg),
            ImageError::ShapeMismatch {
                plane,
                expected,
                actual,
            } => write!(
                f,
                "{} buffer has {} bytes, expected {}",
                plane, actual, expected
            ),
            ImageError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::DeviceUnavailable(msg) => write!(f, "Device unavailable: {}", msg),
            BackendError::FormatMismatch(msg) => write!(f, "Format mismatch: {}", msg),
            BackendError::Image(e) => write!(f, "{}", e),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::OutputDirectory(msg) => {
                write!(f, "Output directory unusable: {}", msg)
            }
            CaptureError::Source(e) => write!(f, "{}", e),
            CaptureError::Image(e) => write!(f, "{}", e),
            CaptureError::Storage(msg) => write!(f, "Failed to write artifact: {}", msg),
        }
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::NoValidDepth => write!(f, "No valid depth points to export"),
            ExportError::Encoding(msg) => write!(f, "Encoding failed: {}", msg),
            ExportError::PointCloud(msg) => write!(f, "Point cloud export failed: {}", msg),
            ExportError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for ImageError {}
impl std::error::Error for BackendError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for ExportError {}

// Conversions from sub-errors to AppError
impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        AppError::Image(err)
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Backend(err)
    }
}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        AppError::Export(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<ImageError> for BackendError {
    fn from(err: ImageError) -> Self {
        BackendError::Image(err)
    }
}

impl From<BackendError> for CaptureError {
    fn from(err: BackendError) -> Self {
        CaptureError::Source(err)
    }
}

impl From<ImageError> for CaptureError {
    fn from(err: ImageError) -> Self {
        CaptureError::Image(err)
    }
}

// Conversions for I/O errors
impl From<std::io::Error> for ImageError {
    fn from(err: std::io::Error) -> Self {
        ImageError::Io(err.to_string())
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Other(err.to_string())
    }
}
