//! Turn scan candidates into usable keys.
//!
//! Every candidate's 32 bytes are checked against the curve; anything that
//! is not a valid scalar is counted and dropped.

use crate::scan::ScanMatch;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};
use vaultscan_core::{address_from_pubkey, wif_encode, NetworkParams};
use vaultscan_crypto::{compress, derive_pubkey};

/// A validated key found on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredKey {
    /// Absolute offset of the container marker
    pub offset: u64,
    /// Private scalar
    pub private_key: [u8; 32],
    /// True if the container held a compressed public key
    pub compressed: bool,
    /// WIF, uncompressed form
    pub wif: String,
    /// WIF, compressed form
    pub wif_compressed: String,
    /// Public key in the container's form
    pub public_key: Vec<u8>,
    /// P2PKH address of the uncompressed public key
    pub address: String,
    /// P2PKH address of the compressed public key
    pub address_compressed: String,
}

impl RecoveredKey {
    /// Private scalar as hex.
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.private_key)
    }

    /// Address matching the container's public key form.
    pub fn primary_address(&self) -> &str {
        if self.compressed {
            &self.address_compressed
        } else {
            &self.address
        }
    }
}

/// Recovery counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryStats {
    /// Candidates examined
    pub candidates: usize,
    /// Keys that passed curve validation
    pub recovered: usize,
    /// Candidates that were not valid scalars
    pub invalid: usize,
    /// Distinct primary addresses among recovered keys
    pub unique_addresses: usize,
}

/// Validate candidates and derive keys, WIFs and addresses.
///
/// Rejected matches are ignored.
pub fn recover_keys(matches: &[ScanMatch], params: &NetworkParams) -> (Vec<RecoveredKey>, RecoveryStats) {
    let mut stats = RecoveryStats::default();
    let mut keys = Vec::new();

    for m in matches.iter().filter(|m| m.is_candidate()) {
        stats.candidates += 1;
        match recover_one(m, params) {
            Some(key) => keys.push(key),
            None => stats.invalid += 1,
        }
    }

    stats.recovered = keys.len();
    stats.unique_addresses = keys
        .iter()
        .map(RecoveredKey::primary_address)
        .collect::<BTreeSet<_>>()
        .len();
    info!(
        candidates = stats.candidates,
        recovered = stats.recovered,
        invalid = stats.invalid,
        "Key recovery finished"
    );
    (keys, stats)
}

fn recover_one(m: &ScanMatch, params: &NetworkParams) -> Option<RecoveredKey> {
    let private_key = m.key()?;
    let uncompressed = match derive_pubkey(&private_key) {
        Ok(pk) => pk,
        Err(e) => {
            debug!(offset = m.offset, error = %e, "Candidate is not a valid scalar");
            return None;
        }
    };
    let compressed_key = compress(&uncompressed).ok()?;
    let compressed = m.marker.compressed;

    Some(RecoveredKey {
        offset: m.offset,
        private_key,
        compressed,
        wif: wif_encode(&private_key, params, false),
        wif_compressed: wif_encode(&private_key, params, true),
        public_key: if compressed {
            compressed_key.to_vec()
        } else {
            uncompressed.to_vec()
        },
        address: address_from_pubkey(&uncompressed, params),
        address_compressed: address_from_pubkey(&compressed_key, params),
    })
}
