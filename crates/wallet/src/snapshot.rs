//! Decoded wallet contents.
//!
//! A [`WalletSnapshot`] is assembled by the decoder from a record stream
//! and is immutable afterwards. Key records are held back until the whole
//! stream has been read, because the master key can appear after the
//! encrypted keys it protects.

use crate::error::Result;
use crate::record::{
    AccountEntry, AccountRecord, BestBlock, HdChain, KeyMetadata, MasterKeyRecord, PoolEntry,
    ScriptRecord, SettingValue, WalletRecord,
};
use crate::tx::Transaction;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};
use vaultscan_core::{address_from_pubkey, p2tr_address, wif_encode, NetworkParams};
use vaultscan_crypto::{compress, derive_pubkey, extract_private_key, tweak_pubkey, MasterSecret};

/// A private scalar with everything derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    /// Private scalar
    pub private_key: [u8; 32],
    /// Public key in the form the wallet uses (33 or 65 bytes)
    pub public_key: Vec<u8>,
    /// True if the wallet uses the compressed form
    pub compressed: bool,
    /// P2PKH address of the uncompressed public key
    pub address: String,
    /// P2PKH address of the compressed public key
    pub address_compressed: String,
    /// P2TR address of the tweaked key, when the network has bech32
    pub taproot_address: Option<String>,
    /// False if the record's public key does not belong to the scalar
    pub matches_record: bool,
}

impl KeyMaterial {
    /// Derive public keys and addresses for `private_key`.
    ///
    /// When `record_pubkey` is given, its length selects the compressed or
    /// uncompressed form and it is checked against the derived key.
    pub fn derive(
        private_key: [u8; 32],
        record_pubkey: Option<&[u8]>,
        params: &NetworkParams,
    ) -> Result<Self> {
        let uncompressed = derive_pubkey(&private_key)?;
        let compressed_key = compress(&uncompressed)?;
        let compressed = record_pubkey.map_or(true, |pk| pk.len() == 33);
        let public_key = if compressed {
            compressed_key.to_vec()
        } else {
            uncompressed.to_vec()
        };
        let matches_record = record_pubkey.map_or(true, |pk| pk == public_key.as_slice());

        let taproot_address = match params.bech32_prefix {
            Some(_) => tweak_pubkey(&compressed_key)
                .ok()
                .and_then(|output| p2tr_address(&output, params).ok()),
            None => None,
        };

        Ok(KeyMaterial {
            private_key,
            address: address_from_pubkey(&uncompressed, params),
            address_compressed: address_from_pubkey(&compressed_key, params),
            public_key,
            compressed,
            taproot_address,
            matches_record,
        })
    }

    /// WIF in the wallet's compression form.
    pub fn wif(&self, params: &NetworkParams) -> String {
        wif_encode(&self.private_key, params, self.compressed)
    }

    /// Private scalar as hex.
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.private_key)
    }
}

/// Outcome of recovering a key's private scalar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum DecryptStatus {
    /// Stored in the clear
    NotEncrypted,
    /// Encrypted and no passphrase was given
    Locked,
    /// Decrypted with the master secret
    Decrypted,
    /// Recovery failed; the reason is kept for reporting
    Failed(String),
}

impl fmt::Display for DecryptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecryptStatus::NotEncrypted => f.write_str("not encrypted"),
            DecryptStatus::Locked => f.write_str("locked"),
            DecryptStatus::Decrypted => f.write_str("decrypted"),
            DecryptStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// One wallet key, encrypted or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    /// Public key as stored
    pub public_key: Vec<u8>,
    /// P2PKH address of the stored public key
    pub address: String,
    /// True for 33-byte public keys
    pub compressed: bool,
    /// Ciphertext, for `ckey` records
    pub encrypted_private_key: Option<Vec<u8>>,
    /// Recovered scalar and derived data, when available
    pub material: Option<KeyMaterial>,
    /// How the scalar was (or was not) recovered
    pub status: DecryptStatus,
    /// Comment from a `wkey` record
    pub comment: Option<String>,
}

impl KeyEntry {
    /// True if the wallet stores this key encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.encrypted_private_key.is_some()
    }

    /// Private key hex, or `ENCRYPTED` when it is not recovered.
    pub fn private_key_display(&self) -> String {
        match &self.material {
            Some(material) => material.private_key_hex(),
            None if self.is_encrypted() => "ENCRYPTED".to_string(),
            None => String::new(),
        }
    }
}

/// Counts reported alongside exports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    /// All key entries
    pub total_keys: usize,
    /// `ckey` entries
    pub encrypted_keys: usize,
    /// `key` / `wkey` entries
    pub unencrypted_keys: usize,
    /// Entries with 33-byte public keys
    pub compressed_keys: usize,
    /// Entries with 65-byte public keys
    pub uncompressed_keys: usize,
    /// Encrypted entries recovered with the passphrase
    pub successfully_decrypted: usize,
    /// Entries whose stored public key does not match the scalar
    pub mismatched_keys: usize,
    /// Distinct addresses across keys and the address book
    pub total_addresses: usize,
    /// Wallet transactions
    pub total_transactions: usize,
    /// Records dropped because they failed to decode
    pub skipped_records: usize,
    /// Records with unknown tags
    pub ignored_records: usize,
}

/// Everything decoded from one wallet store.
#[derive(Debug, Clone, Default)]
pub struct WalletSnapshot {
    /// Wallet version
    pub version: Option<u32>,
    /// Minimum client version
    pub min_version: Option<u32>,
    /// Master key, if the wallet is encrypted
    pub master_key: Option<MasterKeyRecord>,
    /// Keys, in store order
    pub keys: Vec<KeyEntry>,
    /// Settings by name
    pub settings: BTreeMap<String, SettingValue>,
    /// Transactions, in store order
    pub transactions: Vec<Transaction>,
    /// Default key
    pub default_key: Option<Vec<u8>>,
    /// Address book labels
    pub names: BTreeMap<String, String>,
    /// Address purposes
    pub purposes: BTreeMap<String, String>,
    /// Key pool
    pub pool: Vec<PoolEntry>,
    /// Accounts
    pub accounts: Vec<AccountRecord>,
    /// Accounting entries
    pub account_entries: Vec<AccountEntry>,
    /// Best block locator
    pub best_block: Option<BestBlock>,
    /// HD chain state
    pub hd_chain: Option<HdChain>,
    /// Key metadata keyed by public key
    pub key_metadata: Vec<(Vec<u8>, KeyMetadata)>,
    /// Redeem scripts
    pub scripts: Vec<ScriptRecord>,
    /// Next accounting order position
    pub order_pos_next: Option<i64>,
    /// Records that failed to decode
    pub skipped_records: usize,
    /// Records with unknown tags
    pub ignored_records: usize,
}

impl WalletSnapshot {
    /// True if the wallet has a master key.
    pub fn is_encrypted(&self) -> bool {
        self.master_key.is_some()
    }

    /// Encrypted key entries, in store order.
    pub fn encrypted_keys(&self) -> impl Iterator<Item = &KeyEntry> {
        self.keys.iter().filter(|k| k.is_encrypted())
    }

    /// Compute export statistics.
    pub fn statistics(&self) -> Statistics {
        let mut addresses: BTreeSet<&str> = self.keys.iter().map(|k| k.address.as_str()).collect();
        addresses.extend(self.names.keys().map(String::as_str));

        Statistics {
            total_keys: self.keys.len(),
            encrypted_keys: self.keys.iter().filter(|k| k.is_encrypted()).count(),
            unencrypted_keys: self.keys.iter().filter(|k| !k.is_encrypted()).count(),
            compressed_keys: self.keys.iter().filter(|k| k.compressed).count(),
            uncompressed_keys: self.keys.iter().filter(|k| !k.compressed).count(),
            successfully_decrypted: self
                .keys
                .iter()
                .filter(|k| k.status == DecryptStatus::Decrypted)
                .count(),
            mismatched_keys: self
                .keys
                .iter()
                .filter(|k| k.material.as_ref().is_some_and(|m| !m.matches_record))
                .count(),
            total_addresses: addresses.len(),
            total_transactions: self.transactions.len(),
            skipped_records: self.skipped_records,
            ignored_records: self.ignored_records,
        }
    }
}

enum PendingSecret {
    Plain(Vec<u8>),
    Encrypted(Vec<u8>),
}

struct PendingKey {
    public_key: Vec<u8>,
    secret: PendingSecret,
    comment: Option<String>,
}

/// Accumulates records, then resolves keys once the stream is done.
#[derive(Default)]
pub(crate) struct SnapshotBuilder {
    snapshot: WalletSnapshot,
    pending: Vec<PendingKey>,
}

impl SnapshotBuilder {
    pub(crate) fn master_key(&self) -> Option<&MasterKeyRecord> {
        self.snapshot.master_key.as_ref()
    }

    pub(crate) fn skip(&mut self) {
        self.snapshot.skipped_records += 1;
    }

    pub(crate) fn absorb(&mut self, record: WalletRecord) {
        let snap = &mut self.snapshot;
        match record {
            WalletRecord::Version(v) => snap.version = Some(v),
            WalletRecord::MinVersion(v) => snap.min_version = Some(v),
            WalletRecord::Setting { name, value } => {
                snap.settings.insert(name, value);
            }
            WalletRecord::UnencryptedKey {
                public_key,
                private_key,
            } => self.pending.push(PendingKey {
                public_key,
                secret: PendingSecret::Plain(private_key),
                comment: None,
            }),
            WalletRecord::WalletKey {
                public_key,
                private_key,
                comment,
                ..
            } => self.pending.push(PendingKey {
                public_key,
                secret: PendingSecret::Plain(private_key),
                comment: Some(comment),
            }),
            WalletRecord::EncryptedKey {
                public_key,
                encrypted_private_key,
            } => self.pending.push(PendingKey {
                public_key,
                secret: PendingSecret::Encrypted(encrypted_private_key),
                comment: None,
            }),
            WalletRecord::MasterKey(mkey) => {
                if snap.master_key.is_some() {
                    warn!(id = mkey.id, "Ignoring additional master key record");
                } else {
                    snap.master_key = Some(mkey);
                }
            }
            WalletRecord::DefaultKey { public_key } => snap.default_key = Some(public_key),
            WalletRecord::Pool(entry) => snap.pool.push(entry),
            WalletRecord::Account(account) => snap.accounts.push(account),
            WalletRecord::AccountEntry(entry) => snap.account_entries.push(entry),
            WalletRecord::BestBlock(best) => {
                // Prefer the merkle locator when both are present.
                if best.merkle || snap.best_block.is_none() {
                    snap.best_block = Some(best);
                }
            }
            WalletRecord::Transaction(tx) => snap.transactions.push(tx),
            WalletRecord::Name { address, label } => {
                snap.names.insert(address, label);
            }
            WalletRecord::KeyMeta { public_key, meta } => {
                snap.key_metadata.push((public_key, meta));
            }
            WalletRecord::HdChain(chain) => snap.hd_chain = Some(chain),
            WalletRecord::Purpose { address, purpose } => {
                snap.purposes.insert(address, purpose);
            }
            WalletRecord::Script(script) => snap.scripts.push(script),
            WalletRecord::OrderPosNext(n) => snap.order_pos_next = Some(n),
            WalletRecord::Ignored { tag } => {
                debug!(tag = %tag, "Ignoring record with unknown tag");
                snap.ignored_records += 1;
            }
        }
    }

    /// Resolve pending keys.
    ///
    /// `unlock` is `None` when no passphrase was supplied, otherwise the
    /// outcome of unlocking the master key.
    pub(crate) fn finish(
        self,
        params: &NetworkParams,
        unlock: Option<std::result::Result<MasterSecret, String>>,
    ) -> WalletSnapshot {
        let SnapshotBuilder {
            mut snapshot,
            pending,
        } = self;

        for key in pending {
            let (encrypted_private_key, material, status) = match key.secret {
                PendingSecret::Plain(container) => {
                    let (material, status) = resolve_plain(&key.public_key, &container, params);
                    (None, material, status)
                }
                PendingSecret::Encrypted(ciphertext) => {
                    let (material, status) =
                        resolve_encrypted(&key.public_key, &ciphertext, unlock.as_ref(), params);
                    (Some(ciphertext), material, status)
                }
            };
            if material.as_ref().is_some_and(|m| !m.matches_record) {
                warn!(
                    pubkey = %hex::encode(&key.public_key),
                    "Recovered private key does not match the stored public key"
                );
            }
            if let DecryptStatus::Failed(reason) = &status {
                debug!(
                    pubkey = %hex::encode(&key.public_key),
                    reason = %reason,
                    "Key not recovered"
                );
            }
            snapshot.keys.push(KeyEntry {
                compressed: key.public_key.len() == 33,
                address: address_from_pubkey(&key.public_key, params),
                public_key: key.public_key,
                encrypted_private_key,
                material,
                status,
                comment: key.comment,
            });
        }
        snapshot
    }
}

fn resolve_plain(
    public_key: &[u8],
    container: &[u8],
    params: &NetworkParams,
) -> (Option<KeyMaterial>, DecryptStatus) {
    let derived = extract_private_key(container)
        .map_err(Into::into)
        .and_then(|scalar| KeyMaterial::derive(scalar, Some(public_key), params));
    match derived {
        Ok(material) => (Some(material), DecryptStatus::NotEncrypted),
        Err(e) => (None, DecryptStatus::Failed(e.to_string())),
    }
}

fn resolve_encrypted(
    public_key: &[u8],
    ciphertext: &[u8],
    unlock: Option<&std::result::Result<MasterSecret, String>>,
    params: &NetworkParams,
) -> (Option<KeyMaterial>, DecryptStatus) {
    let secret = match unlock {
        None => return (None, DecryptStatus::Locked),
        Some(Err(reason)) => {
            return (None, DecryptStatus::Failed(format!("master key: {}", reason)))
        }
        Some(Ok(secret)) => secret,
    };
    let derived = secret
        .decrypt_private_key(public_key, ciphertext)
        .map_err(Into::into)
        .and_then(|scalar| KeyMaterial::derive(scalar, Some(public_key), params));
    match derived {
        Ok(material) => (Some(material), DecryptStatus::Decrypted),
        Err(e) => (None, DecryptStatus::Failed(e.to_string())),
    }
}
