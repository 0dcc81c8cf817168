//! John the Ripper `$bitcoin$` hash lines.
//!
//! ```text
//! $bitcoin$<len>$<mkey hex>$<len>$<salt hex>$<iterations>$<len>$<ckey hex>$<method>
//! ```
//!
//! Lengths are byte lengths. Only the first encrypted key is included; one
//! is enough to test a candidate passphrase offline.

use crate::record::MasterKeyRecord;
use crate::snapshot::WalletSnapshot;

/// Render the hash for a master key and one encrypted private key.
pub fn john_hash(master_key: &MasterKeyRecord, encrypted_private_key: &[u8]) -> String {
    format!(
        "$bitcoin${}${}${}${}${}${}${}${}",
        master_key.encrypted_key.len(),
        hex::encode(&master_key.encrypted_key),
        master_key.salt.len(),
        hex::encode(&master_key.salt),
        master_key.iterations,
        encrypted_private_key.len(),
        hex::encode(encrypted_private_key),
        master_key.derivation_method,
    )
}

/// The hash for a wallet, or `None` unless it has a master key and at
/// least one encrypted key.
pub fn john_hash_format(snapshot: &WalletSnapshot) -> Option<String> {
    let master_key = snapshot.master_key.as_ref()?;
    let first = snapshot
        .encrypted_keys()
        .find_map(|k| k.encrypted_private_key.as_deref())?;
    Some(john_hash(master_key, first))
}

/// `<basename>:<hash>`, the line format John reads from files.
pub fn john_line(basename: &str, snapshot: &WalletSnapshot) -> Option<String> {
    john_hash_format(snapshot).map(|hash| format!("{}:{}", basename, hash))
}
