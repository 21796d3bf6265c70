//! Crate-level error types.
//!
//! Decoding itself never fails a frame; these errors come from the edges of
//! the crate: sinks, configuration and frame files.

use thiserror::Error;

/// Result type for fallible braille_reader operations
pub type Result<T> = std::result::Result<T, BrailleError>;

/// Errors raised outside the per-cell decode path
#[derive(Error, Debug)]
pub enum BrailleError {
    /// IO error (sink file, frame file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Raster image could not be loaded
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Frame or config JSON could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A configuration value is out of range
    #[error("Invalid config: {field} {reason}")]
    InvalidConfig {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}
