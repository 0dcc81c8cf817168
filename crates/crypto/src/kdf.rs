//! Iterated HMAC-SHA512 passphrase stretching.
//!
//! ```text
//! block i (1-based):   u = HMAC(pass, salt ++ BE32(i))
//!                      repeat iterations-1 times: u = HMAC(pass, u)
//! output:              block1 ++ block2 ++ ... truncated to key_len
//! ```
//!
//! Unlike PBKDF2 the intermediate values are not XOR-accumulated; each
//! block is the last HMAC in its chain.

use crate::error::{CryptoError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// The only derivation method a wallet master key may declare.
pub const DERIVATION_METHOD_HMAC_SHA512: u32 = 0;

/// HMAC-SHA512 output size
const BLOCK_LEN: usize = 64;

/// AES-256 key length
pub(crate) const AES_KEY_LEN: usize = 32;

/// AES-CBC IV length
pub(crate) const AES_IV_LEN: usize = 16;

/// Largest derived key length accepted
pub const MAX_KEY_LENGTH: usize = 1024;

/// Stretched key material.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKey(Vec<u8>);

impl DerivedKey {
    /// Raw derived bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// First 32 bytes: the AES key.
    pub fn cipher_key(&self) -> [u8; AES_KEY_LEN] {
        let mut key = [0u8; AES_KEY_LEN];
        key.copy_from_slice(&self.0[..AES_KEY_LEN]);
        key
    }

    /// Bytes 32..48: the CBC initialization vector.
    pub fn iv(&self) -> [u8; AES_IV_LEN] {
        let mut iv = [0u8; AES_IV_LEN];
        iv.copy_from_slice(&self.0[AES_KEY_LEN..AES_KEY_LEN + AES_IV_LEN]);
        iv
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DerivedKey({} bytes)", self.0.len())
    }
}

fn hmac(passphrase: &[u8], data: &[u8]) -> Result<[u8; BLOCK_LEN]> {
    let mut mac =
        HmacSha512::new_from_slice(passphrase).map_err(|_| CryptoError::DecryptionFailed)?;
    mac.update(data);
    let mut out = [0u8; BLOCK_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

pub(crate) fn check_key_length(key_len: usize) -> Result<()> {
    if key_len < AES_KEY_LEN + AES_IV_LEN {
        return Err(CryptoError::KeyLengthTooShort(key_len));
    }
    if key_len > MAX_KEY_LENGTH {
        return Err(CryptoError::KeyLengthTooLong(key_len));
    }
    Ok(())
}

/// Stretch `passphrase` into `key_len` bytes.
///
/// `key_len` must cover an AES key plus IV (48 bytes) and may not exceed
/// [`MAX_KEY_LENGTH`]. An iteration count of zero is treated as one.
pub fn derive_key(
    passphrase: &[u8],
    salt: &[u8],
    iterations: u32,
    key_len: usize,
) -> Result<DerivedKey> {
    check_key_length(key_len)?;

    let mut out = Vec::with_capacity(key_len + BLOCK_LEN);
    let mut block_index: u32 = 1;
    while out.len() < key_len {
        let mut seed = Vec::with_capacity(salt.len() + 4);
        seed.extend_from_slice(salt);
        seed.extend_from_slice(&block_index.to_be_bytes());

        let mut u = hmac(passphrase, &seed)?;
        for _ in 1..iterations {
            u = hmac(passphrase, &u)?;
        }
        out.extend_from_slice(&u);
        block_index += 1;
    }
    out.truncate(key_len);
    Ok(DerivedKey(out))
}
