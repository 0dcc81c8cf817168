//! Master key and per-key decryption.
//!
//! # Pipeline
//!
//! ```text
//! passphrase ──► derive_key(salt, iterations) ──► key[0..32], iv[32..48]
//!                                                       │
//! mkey.encrypted_key ──► AES-256-CBC ◄──────────────────┘
//!                             │
//!                             ▼
//!                      MasterSecret (32 bytes)
//!                             │
//! ckey.encrypted ──► AES-256-CBC (iv = double_sha256(pubkey)[0..16])
//!                             │
//!                             ▼
//!                     private scalar (32 bytes)
//! ```
//!
//! A wrong passphrase almost always shows up as a padding error, reported
//! as [`CryptoError::DecryptionFailed`]. A padding-valid plaintext of the
//! wrong length is rejected the same way.

use crate::curve::pubkey_matches_scalar;
use crate::error::{CryptoError, Result};
use crate::kdf::{
    check_key_length, derive_key, AES_IV_LEN, AES_KEY_LEN, DERIVATION_METHOD_HMAC_SHA512,
};
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use tracing::{debug, info};
use vaultscan_core::{double_sha256, KdfSettings};

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES block size
const AES_BLOCK_LEN: usize = 16;

/// Default derived key length (key + IV + unused tail)
const DEFAULT_KEY_LENGTH: usize = 64;

/// Decrypt AES-256-CBC with PKCS#7 padding.
///
/// Empty input, input that is not a whole number of blocks, and bad padding
/// all fail with [`CryptoError::DecryptionFailed`].
pub fn aes256_cbc_decrypt(
    key: &[u8; AES_KEY_LEN],
    iv: &[u8; AES_IV_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % AES_BLOCK_LEN != 0 {
        return Err(CryptoError::DecryptionFailed);
    }
    let cipher =
        Aes256CbcDec::new_from_slices(key, iv).map_err(|_| CryptoError::DecryptionFailed)?;
    let mut buf = ciphertext.to_vec();
    let plaintext_len = cipher
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| CryptoError::DecryptionFailed)?
        .len();
    buf.truncate(plaintext_len);
    Ok(buf)
}

/// Parameters of a wallet master key record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterKeyParams {
    /// Encrypted master secret
    pub encrypted_key: Vec<u8>,
    /// KDF salt
    pub salt: Vec<u8>,
    /// KDF method (0 = iterated HMAC-SHA512)
    pub derivation_method: u32,
    /// KDF iteration count
    pub iterations: u32,
}

/// The decrypted 32-byte wallet master secret.
#[derive(Clone, PartialEq, Eq)]
pub struct MasterSecret([u8; 32]);

impl MasterSecret {
    /// Wrap raw secret bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        MasterSecret(bytes)
    }

    /// Raw secret bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Decrypt a wrapped private key.
    ///
    /// The IV is the first 16 bytes of `double_sha256(pubkey)`.
    pub fn decrypt_private_key(&self, pubkey: &[u8], encrypted: &[u8]) -> Result<[u8; 32]> {
        let digest = double_sha256(pubkey);
        let mut iv = [0u8; AES_IV_LEN];
        iv.copy_from_slice(&digest[..AES_IV_LEN]);
        let plaintext = aes256_cbc_decrypt(&self.0, &iv, encrypted)?;
        plaintext
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::DecryptionFailed)
    }

    /// Decrypt a wrapped private key and report whether it matches `pubkey`.
    pub fn decrypt_and_verify(
        &self,
        pubkey: &[u8],
        encrypted: &[u8],
    ) -> Result<([u8; 32], bool)> {
        let scalar = self.decrypt_private_key(pubkey, encrypted)?;
        let matches = pubkey_matches_scalar(pubkey, &scalar)?;
        Ok((scalar, matches))
    }
}

impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterSecret(<redacted>)")
    }
}

/// A compute device picked for passphrase trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceChoice {
    /// Platform index
    pub platform: usize,
    /// Device index within the platform
    pub device: usize,
    /// Candidates handed to the device per batch
    pub work_group_size: usize,
}

/// Chooses the device passphrase trials run on.
///
/// Accelerator bridges live outside this crate; they plug in here.
pub trait DeviceSelector {
    /// Human-readable device name.
    fn name(&self) -> String;

    /// Pick a device, or `None` if nothing usable is present.
    fn select(&self) -> Option<DeviceChoice>;
}

/// The host CPU.
#[derive(Debug, Clone, Copy)]
pub struct CpuDevice {
    /// Candidates per batch
    pub batch_size: usize,
}

impl Default for CpuDevice {
    fn default() -> Self {
        CpuDevice { batch_size: 64 }
    }
}

impl DeviceSelector for CpuDevice {
    fn name(&self) -> String {
        "cpu".to_string()
    }

    fn select(&self) -> Option<DeviceChoice> {
        Some(DeviceChoice {
            platform: 0,
            device: 0,
            work_group_size: self.batch_size.max(1),
        })
    }
}

/// Recovers a wallet master secret from a passphrase.
#[derive(Debug, Clone)]
pub struct MasterKeyDecryptor {
    key_length: usize,
}

impl Default for MasterKeyDecryptor {
    fn default() -> Self {
        MasterKeyDecryptor {
            key_length: DEFAULT_KEY_LENGTH,
        }
    }
}

impl MasterKeyDecryptor {
    /// Decryptor deriving `key_length` bytes per attempt (48 to 1024).
    pub fn new(key_length: usize) -> Result<Self> {
        check_key_length(key_length)?;
        Ok(MasterKeyDecryptor { key_length })
    }

    /// Decryptor configured from `[kdf]` settings.
    pub fn from_settings(settings: &KdfSettings) -> Result<Self> {
        Self::new(settings.key_length)
    }

    /// Derived key length in bytes.
    pub fn key_length(&self) -> usize {
        self.key_length
    }

    /// Unlock the master key with one passphrase.
    pub fn unlock(&self, params: &MasterKeyParams, passphrase: &[u8]) -> Result<MasterSecret> {
        if params.derivation_method != DERIVATION_METHOD_HMAC_SHA512 {
            return Err(CryptoError::UnsupportedDerivation(params.derivation_method));
        }
        let derived = derive_key(passphrase, &params.salt, params.iterations, self.key_length)?;
        let plaintext =
            aes256_cbc_decrypt(&derived.cipher_key(), &derived.iv(), &params.encrypted_key)?;
        let secret: [u8; 32] = plaintext
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::DecryptionFailed)?;
        Ok(MasterSecret(secret))
    }

    /// Try candidates in order and return the index and secret of the first
    /// that unlocks.
    ///
    /// Candidates are taken in batches sized by the device's work group.
    /// An unsupported derivation method fails immediately; any other
    /// per-candidate error just moves on to the next one.
    pub fn try_passphrases<I, P>(
        &self,
        params: &MasterKeyParams,
        candidates: I,
        device: &dyn DeviceSelector,
    ) -> Result<Option<(usize, MasterSecret)>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        if params.derivation_method != DERIVATION_METHOD_HMAC_SHA512 {
            return Err(CryptoError::UnsupportedDerivation(params.derivation_method));
        }
        let choice = device.select().unwrap_or(DeviceChoice {
            platform: 0,
            device: 0,
            work_group_size: 1,
        });
        let batch_size = choice.work_group_size.max(1);
        info!(
            device = %device.name(),
            platform = choice.platform,
            index = choice.device,
            batch_size,
            iterations = params.iterations,
            "Starting passphrase trials"
        );

        let mut batch: Vec<P> = Vec::with_capacity(batch_size);
        let mut tried = 0usize;
        let mut candidates = candidates.into_iter().peekable();
        while candidates.peek().is_some() {
            batch.clear();
            batch.extend(candidates.by_ref().take(batch_size));
            for candidate in &batch {
                match self.unlock(params, candidate.as_ref()) {
                    Ok(secret) => {
                        info!(index = tried, "Passphrase found");
                        return Ok(Some((tried, secret)));
                    }
                    Err(err) => debug!(index = tried, error = %err, "Passphrase rejected"),
                }
                tried += 1;
            }
        }
        info!(tried, "No passphrase unlocked the master key");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{compress, derive_pubkey};
    use aes::cipher::BlockEncryptMut;

    type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;

    fn encrypt(key: &[u8; 32], iv: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
        let mut buf = vec![0u8; plaintext.len() + 16];
        buf[..plaintext.len()].copy_from_slice(plaintext);
        let len = Aes256CbcEnc::new_from_slices(key, iv)
            .unwrap()
            .encrypt_padded_mut::<Pkcs7>(&mut buf, plaintext.len())
            .unwrap()
            .len();
        buf.truncate(len);
        buf
    }

    fn wallet_fixture(passphrase: &[u8], secret: [u8; 32]) -> MasterKeyParams {
        let salt = b"\x01\x02\x03\x04\x05\x06\x07\x08".to_vec();
        let iterations = 25;
        let derived = derive_key(passphrase, &salt, iterations, 64).unwrap();
        MasterKeyParams {
            encrypted_key: encrypt(&derived.cipher_key(), &derived.iv(), &secret),
            salt,
            derivation_method: 0,
            iterations,
        }
    }

    #[test]
    fn test_aes_roundtrip() {
        let key = [7u8; 32];
        let iv = [9u8; 16];
        let ct = encrypt(&key, &iv, b"attack at dawn");
        assert_eq!(ct.len(), 16);
        assert_eq!(aes256_cbc_decrypt(&key, &iv, &ct).unwrap(), b"attack at dawn");
    }

    #[test]
    fn test_aes_rejects_bad_lengths() {
        let key = [7u8; 32];
        let iv = [9u8; 16];
        assert_eq!(
            aes256_cbc_decrypt(&key, &iv, &[]).unwrap_err(),
            CryptoError::DecryptionFailed
        );
        assert_eq!(
            aes256_cbc_decrypt(&key, &iv, &[0u8; 17]).unwrap_err(),
            CryptoError::DecryptionFailed
        );
    }

    #[test]
    fn test_unlock_with_correct_passphrase() {
        let secret = [0x5au8; 32];
        let params = wallet_fixture(b"hunter2", secret);
        let unlocked = MasterKeyDecryptor::default().unlock(&params, b"hunter2").unwrap();
        assert_eq!(unlocked.as_bytes(), &secret);
    }

    #[test]
    fn test_unlock_with_wrong_passphrase_fails() {
        let params = wallet_fixture(b"hunter2", [0x5au8; 32]);
        // A wrong key may still produce valid padding by chance, but then the
        // plaintext length check rejects it.
        assert_eq!(
            MasterKeyDecryptor::default()
                .unlock(&params, b"hunter3")
                .unwrap_err(),
            CryptoError::DecryptionFailed
        );
    }

    #[test]
    fn test_unsupported_derivation() {
        let mut params = wallet_fixture(b"pw", [1u8; 32]);
        params.derivation_method = 1;
        assert_eq!(
            MasterKeyDecryptor::default().unlock(&params, b"pw").unwrap_err(),
            CryptoError::UnsupportedDerivation(1)
        );
    }

    #[test]
    fn test_short_key_length_rejected() {
        assert!(MasterKeyDecryptor::new(32).is_err());
        assert_eq!(MasterKeyDecryptor::new(48).unwrap().key_length(), 48);
    }

    #[test]
    fn test_oversized_key_length_rejected() {
        assert_eq!(
            MasterKeyDecryptor::new(usize::MAX).unwrap_err(),
            CryptoError::KeyLengthTooLong(usize::MAX)
        );
        assert!(MasterKeyDecryptor::new(1025).is_err());
        assert_eq!(MasterKeyDecryptor::new(1024).unwrap().key_length(), 1024);
    }

    #[test]
    fn test_decrypt_private_key_with_pubkey_iv() {
        let master = MasterSecret::from_bytes([0x33u8; 32]);
        let mut scalar = [0u8; 32];
        scalar[31] = 0x2a;
        let pubkey = compress(&derive_pubkey(&scalar).unwrap()).unwrap();

        let digest = double_sha256(&pubkey);
        let mut iv = [0u8; 16];
        iv.copy_from_slice(&digest[..16]);
        let encrypted = encrypt(master.as_bytes(), &iv, &scalar);

        let (recovered, matches) = master.decrypt_and_verify(&pubkey, &encrypted).unwrap();
        assert_eq!(recovered, scalar);
        assert!(matches);

        // The wrong IV only garbles the first block; padding still checks out.
        let other = compress(&derive_pubkey(&[0x01; 32]).unwrap()).unwrap();
        let (garbled, matches) = master.decrypt_and_verify(&other, &encrypted).unwrap();
        assert_ne!(garbled, scalar);
        assert_eq!(&garbled[16..], &scalar[16..]);
        assert!(!matches);
    }

    #[test]
    fn test_try_passphrases_finds_index() {
        let secret = [0x77u8; 32];
        let params = wallet_fixture(b"correct horse", secret);
        let candidates = ["a", "b", "c", "correct horse", "d"];
        let device = CpuDevice { batch_size: 2 };

        let (index, found) = MasterKeyDecryptor::default()
            .try_passphrases(&params, candidates, &device)
            .unwrap()
            .unwrap();
        assert_eq!(index, 3);
        assert_eq!(found.as_bytes(), &secret);
    }

    #[test]
    fn test_try_passphrases_none() {
        let params = wallet_fixture(b"secret", [1u8; 32]);
        let result = MasterKeyDecryptor::default()
            .try_passphrases(&params, vec![b"x".to_vec()], &CpuDevice::default())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_master_secret_debug_is_redacted() {
        let secret = MasterSecret::from_bytes([0xab; 32]);
        assert!(!format!("{:?}", secret).contains("ab"));
    }
}
