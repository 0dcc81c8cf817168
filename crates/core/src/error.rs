//! Error types for the core layer
//!
//! Stream errors are kept separate from the wider `CoreError` so record
//! decoders can match on truncation without dragging in I/O or config
//! failures. We use `thiserror` for `Display` and `Error` impls.

use std::io;
use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by [`ByteCursor`](crate::stream::ByteCursor) reads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// Buffer exhausted mid-read
    #[error("Truncated: wanted {wanted} bytes at offset {offset}, {available} available")]
    Truncated {
        /// Read position when the read was attempted
        offset: usize,
        /// Bytes the read needed
        wanted: usize,
        /// Bytes left in the buffer
        available: usize,
    },

    /// Compact-size length does not fit the platform's address space
    #[error("Compact size {0} exceeds addressable length")]
    Oversized(u64),
}

impl StreamError {
    /// Returns true if this is a truncation error.
    pub fn is_truncated(&self) -> bool {
        matches!(self, StreamError::Truncated { .. })
    }
}

/// Error types for the core layer
#[derive(Debug, Error)]
pub enum CoreError {
    /// Binary stream read failed
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Base58check checksum did not match the payload
    #[error("Base58check checksum mismatch")]
    ChecksumMismatch,

    /// Input is not valid for the requested encoding
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Network name not in the known table
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_display() {
        let err = StreamError::Truncated {
            offset: 7,
            wanted: 4,
            available: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("Truncated"));
        assert!(msg.contains("offset 7"));
        assert!(err.is_truncated());
    }

    #[test]
    fn test_stream_error_converts() {
        let err: CoreError = StreamError::Oversized(u64::MAX).into();
        assert!(matches!(err, CoreError::Stream(StreamError::Oversized(_))));
        assert!(!StreamError::Oversized(1).is_truncated());
    }

    #[test]
    fn test_error_display_io() {
        let err = CoreError::Io(io::Error::new(io::ErrorKind::NotFound, "device missing"));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_error_display_unknown_network() {
        let err = CoreError::UnknownNetwork("dogecoin".to_string());
        assert!(err.to_string().contains("dogecoin"));
    }
}
