//! Cryptographic reconstruction for Vaultscan
//!
//! This crate handles everything that turns raw wallet bytes into verified
//! key material:
//!
//! - Curve: secp256k1 affine arithmetic, public key derivation, point
//!   compression and decompression
//! - Taproot: BIP-340 tagged hashes, `lift_x`, BIP-341 output key tweak
//! - Containers: raw 32-byte scalars and legacy DER-wrapped private keys
//! - KDF: iterated HMAC-SHA512 passphrase stretching
//! - Decrypt: AES-256-CBC master key and per-key secret recovery

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod container;
pub mod curve;
pub mod decrypt;
pub mod error;
pub mod kdf;
pub mod taproot;

pub use container::{extract_private_key, DerContainer, KeyContainer, RawScalar};
pub use curve::{
    compress, decompress, derive_pubkey, parse_point, point_add, point_double,
    pubkey_matches_scalar, scalar_multiply, serialize_uncompressed, Point,
};
pub use decrypt::{
    aes256_cbc_decrypt, CpuDevice, DeviceChoice, DeviceSelector, MasterKeyDecryptor,
    MasterKeyParams, MasterSecret,
};
pub use error::{CryptoError, Result};
pub use kdf::{derive_key, DerivedKey, DERIVATION_METHOD_HMAC_SHA512, MAX_KEY_LENGTH};
pub use taproot::{lift_x, tagged_hash, tweak_pubkey, TAP_TWEAK_TAG_HASH};
