//! Vaultscan - forensic key recovery for legacy wallet stores
//!
//! Vaultscan pulls private keys, master-key material and addresses out of
//! legacy wallet record stores and raw storage media:
//!
//! - [`vaultscan_core`]: byte stream codec, base58check / WIF / address encodings,
//!   network parameters, `vaultscan.toml` configuration
//! - [`vaultscan_crypto`]: secp256k1 arithmetic, Taproot tweaks, DER key containers,
//!   master key decryption
//! - [`vaultscan_wallet`]: record decoding into a [`WalletSnapshot`], John the Ripper
//!   hashes, JSON / CSV / text export
//! - [`vaultscan_scanner`]: three-pass marker scan of disk images and key recovery
//!
//! # Quick Start
//!
//! ```ignore
//! use vaultscan::{NetworkParams, WalletDecoder, ExportContext, ExportFormat};
//!
//! // `pairs` is any iterator of (key, value) byte vectors from the store
//! let decoder = WalletDecoder::new(NetworkParams::BITCOIN);
//! let snapshot = decoder.decode_snapshot(pairs, Some("passphrase"));
//!
//! let ctx = ExportContext::new("wallet.dat", NetworkParams::BITCOIN);
//! let json = vaultscan::export(&snapshot, ExportFormat::Json, &ctx)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod logging;

pub use vaultscan_core;
pub use vaultscan_crypto;
pub use vaultscan_scanner;
pub use vaultscan_wallet;

pub use error::{Error, Result};
pub use vaultscan_core::{Network, NetworkParams, VaultscanConfig};
pub use vaultscan_crypto::{MasterKeyDecryptor, MasterSecret};
pub use vaultscan_scanner::{recover_keys, DiskScanner, RecoveredKey, ScanConfig, ScanReport};
pub use vaultscan_wallet::{
    export, john_line, ExportContext, ExportFormat, WalletDecoder, WalletRecord, WalletSnapshot,
};

/// Decoder and scanner set up from one configuration.
///
/// ```ignore
/// let config = VaultscanConfig::load_or_default(Path::new("vaultscan.toml"))?;
/// let toolkit = vaultscan::Toolkit::from_config(&config)?;
/// let report = toolkit.scanner.scan_path(Path::new("/dev/sdb"))?;
/// ```
#[derive(Debug, Clone)]
pub struct Toolkit {
    /// Network the configuration selects
    pub params: NetworkParams,
    /// Wallet decoder using the configured key derivation length
    pub decoder: WalletDecoder,
    /// Scanner using the configured block sizes
    pub scanner: DiskScanner,
}

impl Toolkit {
    /// Build from a loaded configuration.
    pub fn from_config(config: &VaultscanConfig) -> Result<Self> {
        let params = config.network_params()?;
        let decryptor = MasterKeyDecryptor::from_settings(&config.kdf)?;
        let scanner = DiskScanner::new(ScanConfig::from_settings(&config.scanner))?;
        Ok(Toolkit {
            params,
            decoder: WalletDecoder::new(params).with_decryptor(decryptor),
            scanner,
        })
    }
}
