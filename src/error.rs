//! Top-level error type
//!
//! Wraps the per-crate errors so callers that drive the whole pipeline can
//! use one `Result`.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Any error raised by a Vaultscan layer
#[derive(Debug, Error)]
pub enum Error {
    /// Encoding, stream or configuration failure
    #[error(transparent)]
    Core(#[from] vaultscan_core::CoreError),

    /// Curve or decryption failure
    #[error(transparent)]
    Crypto(#[from] vaultscan_crypto::CryptoError),

    /// Wallet decoding or export failure
    #[error(transparent)]
    Wallet(#[from] vaultscan_wallet::WalletError),

    /// Device scan failure
    #[error(transparent)]
    Scan(#[from] vaultscan_scanner::ScanError),
}
