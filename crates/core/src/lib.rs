//! Core types for Vaultscan
//!
//! This crate defines the foundational pieces every other layer builds on:
//! - ByteCursor / ByteWriter: compact-size framed binary stream codec
//! - Encoding: double-SHA256, hash160, base58check, WIF, P2TR addresses
//! - NetworkParams: explicit per-network version bytes (no global state)
//! - Config: `vaultscan.toml` loading
//! - Error: error type hierarchy for the core layer

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod encoding;
pub mod error;
pub mod network;
pub mod stream;

pub use config::{KdfSettings, ScannerSettings, VaultscanConfig, CONFIG_FILE_NAME};
pub use encoding::{
    address_from_hash160, address_from_pubkey, base58check_decode, base58check_encode,
    base58check_verify, double_sha256, hash160, p2tr_address, script_address, sha256, wif_decode,
    wif_encode,
};
pub use error::{CoreError, Result, StreamError};
pub use network::{Network, NetworkParams};
pub use stream::{compact_size_len, ByteCursor, ByteWriter};
