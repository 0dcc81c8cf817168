//! Error types for the scanner

use crate::scan::ScanConfigError;
use std::io;
use thiserror::Error;

/// Result type alias for scanner operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// Scanner errors.
///
/// Only source-level failures (length unknown, config invalid) reach the
/// caller. A [`ScanError::DeviceReadError`] for a single block is logged and
/// the scan moves on.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A block could not be read
    #[error("Device read error at offset {offset}: {message}")]
    DeviceReadError {
        /// Absolute offset of the failed read
        offset: u64,
        /// Underlying error text
        message: String,
    },

    /// Source-level I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Scan configuration rejected by `validate()`
    #[error("Invalid scan configuration: {0}")]
    Config(#[from] ScanConfigError),
}
