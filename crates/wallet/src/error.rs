//! Error types for wallet decoding and export

use thiserror::Error;
use vaultscan_core::{CoreError, StreamError};
use vaultscan_crypto::CryptoError;

/// Result type alias for wallet operations
pub type Result<T> = std::result::Result<T, WalletError>;

/// Errors raised while decoding records or rendering exports
#[derive(Debug, Error)]
pub enum WalletError {
    /// A record field ran past the end of its buffer
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// Tag is not one of the known record types
    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),

    /// Fields decoded but their values make no sense
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Key material could not be reconstructed
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Encoding or configuration failure from the core layer
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// The pair source itself failed; decoding cannot continue
    #[error("Record source failed: {0}")]
    Source(#[from] std::io::Error),

    /// Export serialization failed
    #[error("Export failed: {0}")]
    Export(String),
}

impl From<serde_json::Error> for WalletError {
    fn from(e: serde_json::Error) -> Self {
        WalletError::Export(e.to_string())
    }
}
