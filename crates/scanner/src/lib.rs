//! Raw device key recovery for Vaultscan
//!
//! Scans arbitrarily large byte sources (disk images, block devices,
//! unallocated space dumps) for legacy DER private key containers:
//! - markers: container prefixes and post-key markers
//! - scan: three-pass coarse / refine / exact search with cancellation
//! - recover: curve validation and WIF / address derivation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod markers;
pub mod recover;
pub mod scan;

pub use error::{Result, ScanError};
pub use markers::{KeyMarker, KEY_MARKERS, POST_KEY_MARKERS};
pub use recover::{recover_keys, RecoveredKey, RecoveryStats};
pub use scan::{
    ByteRange, DiskScanner, MatchKind, ScanConfig, ScanConfigError, ScanMatch, ScanReport,
    ScanStats, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE,
};
