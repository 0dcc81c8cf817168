//! Error types for the crypto layer

use thiserror::Error;

/// Result type alias for crypto operations
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Error types for curve, container and decryption operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Scalar is zero, not below the curve order, or not a parseable container
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Bytes do not describe a point on secp256k1
    #[error("Invalid point: {0}")]
    InvalidPoint(String),

    /// Cipher rejected the input (wrong passphrase, bad padding, corrupted
    /// ciphertext). Deliberately carries no detail.
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Master key uses a derivation method other than iterated HMAC-SHA512
    #[error("Unsupported key derivation method: {0}")]
    UnsupportedDerivation(u32),

    /// Requested derived key is too short to hold an AES key and IV
    #[error("Derived key length {0} is too short (need at least 48 bytes)")]
    KeyLengthTooShort(usize),

    /// Requested derived key is longer than [`crate::MAX_KEY_LENGTH`]
    #[error("Derived key length {0} is too long (at most 1024 bytes)")]
    KeyLengthTooLong(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decryption_failed_has_no_detail() {
        assert_eq!(CryptoError::DecryptionFailed.to_string(), "Decryption failed");
    }

    #[test]
    fn test_invalid_point_display() {
        let err = CryptoError::InvalidPoint("x not on curve".to_string());
        assert!(err.to_string().contains("x not on curve"));
    }
}
