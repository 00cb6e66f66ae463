//! Error types for the retrace pipeline.
//!
//! Errors are organized by stage so that a failure names the file and the
//! stage it came from. Outcomes that are normal negative results (no
//! qualifying reference, an ambiguous duplicate group) are not errors; they
//! live in [`crate::inference::Estimate`] and [`crate::merge::MergeDecision`].

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for retrace operations.
#[derive(Error, Debug)]
pub enum RetraceError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Per-image pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Per-image errors. None of these abort a batch: the image is skipped and
/// recorded as unprocessable.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Pixel data could not be obtained (corrupt or undecodable file)
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The batch was abandoned before this image was reached
    #[error("Cancelled before processing {0}")]
    Cancelled(PathBuf),
}

impl PipelineError {
    /// Path of the image this error belongs to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            PipelineError::Decode { path, .. }
            | PipelineError::FileTooLarge { path, .. }
            | PipelineError::ImageTooLarge { path, .. }
            | PipelineError::UnsupportedFormat { path, .. } => path,
            PipelineError::FileNotFound(path) | PipelineError::Cancelled(path) => path,
        }
    }

    pub(crate) fn decode(path: &std::path::Path, message: impl Into<String>) -> Self {
        PipelineError::Decode {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Convenience type alias for retrace results.
pub type Result<T> = std::result::Result<T, RetraceError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
