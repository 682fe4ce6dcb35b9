//! Error types for the PPU asset pipeline.

use std::io;
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PpuPackError>;

/// Errors that can occur while converting images to PPU data.
#[derive(Debug, Error)]
pub enum PpuPackError {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// PNG decoding failed.
    #[error("PNG decode error: {0}")]
    Decode(#[from] png::DecodingError),

    /// A palette argument or palette file is malformed.
    #[error("Invalid palette: {0}")]
    InvalidPalette(String),
}
