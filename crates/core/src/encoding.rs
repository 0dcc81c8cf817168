//! Address and key encoding primitives.
//!
//! - `double_sha256` / `hash160`: the two digests addresses are built from
//! - base58check: `base58(version ++ payload ++ checksum4)`
//! - WIF: base58check of `private_key_version ++ key ++ [0x01 if compressed]`
//! - P2TR: bech32m witness-v1 program over a tweaked output key
//!
//! `base58check_decode` is deliberately lenient: it checks only the decoded
//! length, not the checksum. Callers that need a strict decode compose it
//! with [`base58check_verify`].

use crate::error::{CoreError, Result};
use crate::network::NetworkParams;
use bech32::{u5, ToBase32, Variant};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Length of the base58check checksum suffix
const CHECKSUM_LEN: usize = 4;

/// Compression flag appended to WIF payloads for compressed keys
const WIF_COMPRESSED_FLAG: u8 = 0x01;

/// Taproot witness version
const TAPROOT_WITNESS_VERSION: u8 = 1;

/// Single SHA-256.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SHA-256 applied twice.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}

/// RIPEMD-160 of SHA-256.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}

fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = double_sha256(data);
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Base58check-encode `version ++ payload`.
///
/// Leading zero bytes map to leading `1` characters.
pub fn base58check_encode(versioned_payload: &[u8]) -> String {
    let mut buf = Vec::with_capacity(versioned_payload.len() + CHECKSUM_LEN);
    buf.extend_from_slice(versioned_payload);
    buf.extend_from_slice(&checksum(versioned_payload));
    bs58::encode(buf).into_string()
}

/// Decode base58check text into `version ++ payload` without verifying the
/// checksum.
///
/// Returns `None` if the text is not base58, or if the decoded length
/// (checksum excluded) is not `expected_length`.
pub fn base58check_decode(text: &str, expected_length: usize) -> Option<Vec<u8>> {
    let mut raw = bs58::decode(text).into_vec().ok()?;
    if raw.len() < CHECKSUM_LEN || raw.len() - CHECKSUM_LEN != expected_length {
        return None;
    }
    raw.truncate(expected_length);
    Some(raw)
}

/// Decode base58check text and verify its checksum.
pub fn base58check_verify(text: &str) -> Result<Vec<u8>> {
    let mut raw = bs58::decode(text)
        .into_vec()
        .map_err(|e| CoreError::InvalidEncoding(format!("base58: {}", e)))?;
    if raw.len() < CHECKSUM_LEN {
        return Err(CoreError::InvalidEncoding(format!(
            "base58check payload too short: {} bytes",
            raw.len()
        )));
    }
    let split = raw.len() - CHECKSUM_LEN;
    if raw[split..] != checksum(&raw[..split]) {
        return Err(CoreError::ChecksumMismatch);
    }
    raw.truncate(split);
    Ok(raw)
}

/// P2PKH address for a 20-byte key hash.
pub fn address_from_hash160(hash: &[u8; 20], params: &NetworkParams) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(params.address_version);
    payload.extend_from_slice(hash);
    base58check_encode(&payload)
}

/// P2PKH address for a serialized public key (33 or 65 bytes, unchecked).
pub fn address_from_pubkey(pubkey: &[u8], params: &NetworkParams) -> String {
    address_from_hash160(&hash160(pubkey), params)
}

/// P2SH address for a redeem script.
pub fn script_address(script: &[u8], params: &NetworkParams) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(params.script_version);
    payload.extend_from_slice(&hash160(script));
    base58check_encode(&payload)
}

/// Encode a 32-byte private key in Wallet Import Format.
pub fn wif_encode(private_key: &[u8; 32], params: &NetworkParams, compressed: bool) -> String {
    let mut payload = Vec::with_capacity(34);
    payload.push(params.private_key_version);
    payload.extend_from_slice(private_key);
    if compressed {
        payload.push(WIF_COMPRESSED_FLAG);
    }
    base58check_encode(&payload)
}

/// Decode a WIF string, returning the key and its compression flag.
///
/// The checksum and version byte are both verified.
pub fn wif_decode(text: &str, params: &NetworkParams) -> Result<([u8; 32], bool)> {
    let payload = base58check_verify(text)?;
    let compressed = match payload.len() {
        33 => false,
        34 if payload[33] == WIF_COMPRESSED_FLAG => true,
        n => {
            return Err(CoreError::InvalidEncoding(format!(
                "WIF payload has unexpected length {}",
                n
            )))
        }
    };
    if payload[0] != params.private_key_version {
        return Err(CoreError::InvalidEncoding(format!(
            "WIF version byte {:#04x} does not match network {}",
            payload[0], params.name
        )));
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&payload[1..33]);
    Ok((key, compressed))
}

/// Bech32m P2TR address for a 32-byte tweaked output key.
pub fn p2tr_address(output_key: &[u8; 32], params: &NetworkParams) -> Result<String> {
    let hrp = params.bech32_prefix.ok_or_else(|| {
        CoreError::InvalidEncoding(format!("network {} has no bech32 prefix", params.name))
    })?;
    let version = u5::try_from_u8(TAPROOT_WITNESS_VERSION)
        .map_err(|e| CoreError::InvalidEncoding(e.to_string()))?;
    let mut data = vec![version];
    data.extend(output_key.to_base32());
    bech32::encode(hrp, data, Variant::Bech32m)
        .map_err(|e| CoreError::InvalidEncoding(e.to_string()))
}
