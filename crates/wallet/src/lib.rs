//! Wallet record decoding for Vaultscan
//!
//! Turns raw key/value pairs from a wallet store into a [`WalletSnapshot`]:
//! - record: tag dispatch and per-record value layouts
//! - tx: transaction serialization, with segwit
//! - decoder: tolerant stream decoding and master key unlock
//! - snapshot: decoded wallet contents and key recovery status
//! - john: `$bitcoin$` hash lines for offline passphrase recovery
//! - export: JSON, CSV and text dumps

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decoder;
pub mod error;
pub mod export;
pub mod john;
pub mod record;
pub mod snapshot;
pub mod tx;

pub use decoder::{decode_records, try_decode_records, DecodeStats, WalletDecoder};
pub use error::{Result, WalletError};
pub use export::{export, write_export, ExportContext, ExportFormat, CSV_HEADER};
pub use john::{john_hash, john_hash_format, john_line};
pub use record::{
    AccountEntry, AccountRecord, BestBlock, HdChain, KeyMetadata, MasterKeyRecord,
    NetworkAddress, PoolEntry, RecordTag, ScriptRecord, SettingValue, WalletRecord,
};
pub use snapshot::{DecryptStatus, KeyEntry, KeyMaterial, Statistics, WalletSnapshot};
pub use tx::{Transaction, TxIn, TxOut};
