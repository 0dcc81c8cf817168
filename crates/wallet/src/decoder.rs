//! Tolerant record stream decoder.
//!
//! Real wallet captures contain partially overwritten and foreign records.
//! The decoder treats every pair independently:
//!
//! ```text
//! (key, value) ──► WalletRecord::decode ──┬─► Ok(record)   → callback
//!                                         └─► Err(_)       → skipped, logged
//! ```
//!
//! A bad record never stops the stream. Only a failing pair source (the
//! store itself returning an I/O error) aborts decoding.

use crate::error::Result;
use crate::record::WalletRecord;
use crate::snapshot::{SnapshotBuilder, WalletSnapshot};
use tracing::{debug, info, warn};
use vaultscan_core::NetworkParams;
use vaultscan_crypto::MasterKeyDecryptor;

/// Per-stream counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Pairs seen
    pub total: usize,
    /// Pairs decoded into a known record
    pub decoded: usize,
    /// Pairs with an unknown tag
    pub ignored: usize,
    /// Pairs that failed to decode
    pub skipped: usize,
}

/// Decode every pair, handing each successfully decoded record to
/// `on_record`. Records that fail to decode are skipped.
pub fn decode_records<I, F>(pairs: I, mut on_record: F) -> DecodeStats
where
    I: IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
    F: FnMut(WalletRecord),
{
    let mut stats = DecodeStats::default();
    for (index, (key, value)) in pairs.into_iter().enumerate() {
        stats.total += 1;
        match WalletRecord::decode(&key, &value) {
            Ok(record) => {
                if matches!(record, WalletRecord::Ignored { .. }) {
                    stats.ignored += 1;
                } else {
                    stats.decoded += 1;
                }
                on_record(record);
            }
            Err(e) => {
                debug!(index, error = %e, "Skipping undecodable record");
                stats.skipped += 1;
            }
        }
    }
    if stats.skipped > 0 {
        warn!(
            skipped = stats.skipped,
            total = stats.total,
            "Skipped corrupted wallet records"
        );
    }
    stats
}

/// Like [`decode_records`], but over a fallible source.
///
/// The first source error ends decoding and is returned.
pub fn try_decode_records<I, F>(pairs: I, mut on_record: F) -> Result<DecodeStats>
where
    I: IntoIterator<Item = std::io::Result<(Vec<u8>, Vec<u8>)>>,
    F: FnMut(WalletRecord),
{
    let mut source_error = None;
    let stats = decode_records(
        pairs.into_iter().map_while(|pair| match pair {
            Ok(pair) => Some(pair),
            Err(e) => {
                source_error = Some(e);
                None
            }
        }),
        &mut on_record,
    );
    match source_error {
        Some(e) => Err(e.into()),
        None => Ok(stats),
    }
}

/// Builds [`WalletSnapshot`]s for one network.
#[derive(Debug, Clone)]
pub struct WalletDecoder {
    params: NetworkParams,
    decryptor: MasterKeyDecryptor,
}

impl WalletDecoder {
    /// Decoder for `params` with the default key derivation length.
    pub fn new(params: NetworkParams) -> Self {
        WalletDecoder {
            params,
            decryptor: MasterKeyDecryptor::default(),
        }
    }

    /// Use a specific master key decryptor.
    pub fn with_decryptor(mut self, decryptor: MasterKeyDecryptor) -> Self {
        self.decryptor = decryptor;
        self
    }

    /// Network parameters used for addresses.
    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    /// Decode a pair stream into a snapshot.
    ///
    /// With a passphrase, every encrypted key is decrypted; failures are
    /// recorded per key and never abort.
    pub fn decode_snapshot<I>(&self, pairs: I, passphrase: Option<&str>) -> WalletSnapshot
    where
        I: IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
    {
        let mut builder = SnapshotBuilder::default();
        let stats = decode_records(pairs, |record| builder.absorb(record));
        for _ in 0..stats.skipped {
            builder.skip();
        }
        self.finish(builder, stats, passphrase)
    }

    /// Decode a fallible pair stream into a snapshot.
    pub fn try_decode_snapshot<I>(&self, pairs: I, passphrase: Option<&str>) -> Result<WalletSnapshot>
    where
        I: IntoIterator<Item = std::io::Result<(Vec<u8>, Vec<u8>)>>,
    {
        let mut builder = SnapshotBuilder::default();
        let stats = try_decode_records(pairs, |record| builder.absorb(record))?;
        for _ in 0..stats.skipped {
            builder.skip();
        }
        Ok(self.finish(builder, stats, passphrase))
    }

    fn finish(
        &self,
        builder: SnapshotBuilder,
        stats: DecodeStats,
        passphrase: Option<&str>,
    ) -> WalletSnapshot {
        let unlock = passphrase.map(|pass| match builder.master_key() {
            None => Err("no master key record".to_string()),
            Some(mkey) => self
                .decryptor
                .unlock(&mkey.params(), pass.as_bytes())
                .map_err(|e| e.to_string()),
        });
        match &unlock {
            Some(Ok(_)) => info!("Master key unlocked"),
            Some(Err(reason)) => warn!(reason = %reason, "Could not unlock master key"),
            None => {}
        }

        let snapshot = builder.finish(&self.params, unlock);
        info!(
            records = stats.total,
            decoded = stats.decoded,
            ignored = stats.ignored,
            skipped = stats.skipped,
            keys = snapshot.keys.len(),
            "Wallet decoded"
        );
        snapshot
    }
}
