//! Private key containers.
//!
//! Wallets store private keys in one of two shapes:
//!
//! - a raw 32-byte scalar
//! - a legacy OpenSSL `ECPrivateKey` DER structure (pre-2010 wallets)
//!
//! ```text
//! SEQUENCE (0x30, len)
//!   INTEGER 1            02 01 01
//!   OCTET STRING key     04 <len ≤ 32> <key bytes>
//!   [0] parameters ...   (ignored)
//!   [1] public key ...   (ignored)
//! ```
//!
//! Each shape is a [`KeyContainer`]; [`extract_private_key`] picks one by
//! length and leading byte.

use crate::error::{CryptoError, Result};
use vaultscan_core::ByteCursor;

/// ASN.1 SEQUENCE tag
const DER_SEQUENCE: u8 = 0x30;
/// ASN.1 INTEGER tag
const DER_INTEGER: u8 = 0x02;
/// ASN.1 OCTET STRING tag
const DER_OCTET_STRING: u8 = 0x04;

/// A way of wrapping a 32-byte private scalar.
pub trait KeyContainer {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// True if `bytes` has the shape of this container.
    fn matches(&self, bytes: &[u8]) -> bool;

    /// Extract the scalar, left-padded to 32 bytes.
    fn extract_scalar(&self, bytes: &[u8]) -> Result<[u8; 32]>;
}

/// A bare 32-byte big-endian scalar.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawScalar;

impl KeyContainer for RawScalar {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn matches(&self, bytes: &[u8]) -> bool {
        bytes.len() == 32
    }

    fn extract_scalar(&self, bytes: &[u8]) -> Result<[u8; 32]> {
        bytes.try_into().map_err(|_| {
            CryptoError::InvalidPrivateKey(format!("expected 32 bytes, got {}", bytes.len()))
        })
    }
}

/// A DER `ECPrivateKey` structure.
#[derive(Debug, Clone, Copy, Default)]
pub struct DerContainer;

fn malformed(what: &str) -> CryptoError {
    CryptoError::InvalidPrivateKey(format!("malformed DER key: {}", what))
}

fn expect_tag(cursor: &mut ByteCursor, tag: u8) -> Result<()> {
    let found = cursor.read_u8().map_err(|_| malformed("truncated"))?;
    if found != tag {
        return Err(malformed(&format!("expected tag {:#04x}, found {:#04x}", tag, found)));
    }
    Ok(())
}

/// Short form (`< 0x80`) or long form with one or two length bytes.
fn read_der_length(cursor: &mut ByteCursor) -> Result<usize> {
    let first = cursor.read_u8().map_err(|_| malformed("truncated length"))?;
    if first < 0x80 {
        return Ok(first as usize);
    }
    let width = (first & 0x7f) as usize;
    if width == 0 || width > 2 {
        return Err(malformed("unsupported length form"));
    }
    let bytes = cursor
        .read_bytes(width)
        .map_err(|_| malformed("truncated length"))?;
    Ok(bytes.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize))
}

impl KeyContainer for DerContainer {
    fn name(&self) -> &'static str {
        "der"
    }

    fn matches(&self, bytes: &[u8]) -> bool {
        bytes.len() > 32 && bytes[0] == DER_SEQUENCE
    }

    fn extract_scalar(&self, bytes: &[u8]) -> Result<[u8; 32]> {
        let mut cursor = ByteCursor::from_slice(bytes);
        expect_tag(&mut cursor, DER_SEQUENCE)?;
        let body_len = read_der_length(&mut cursor)?;
        if body_len > cursor.remaining() {
            return Err(malformed("sequence longer than input"));
        }

        expect_tag(&mut cursor, DER_INTEGER)?;
        let version = cursor
            .read_string()
            .map_err(|_| malformed("truncated version"))?;
        if version != [0x01] {
            return Err(malformed("unexpected version"));
        }

        expect_tag(&mut cursor, DER_OCTET_STRING)?;
        let key_len = read_der_length(&mut cursor)?;
        if key_len == 0 || key_len > 32 {
            return Err(malformed(&format!("key length {}", key_len)));
        }
        let key = cursor
            .read_bytes(key_len)
            .map_err(|_| malformed("truncated key"))?;

        let mut scalar = [0u8; 32];
        scalar[32 - key_len..].copy_from_slice(&key);
        Ok(scalar)
    }
}

/// Pick a container by shape and extract the 32-byte scalar.
pub fn extract_private_key(bytes: &[u8]) -> Result<[u8; 32]> {
    let containers: [&dyn KeyContainer; 2] = [&RawScalar, &DerContainer];
    for container in containers {
        if container.matches(bytes) {
            tracing::trace!(
                container = container.name(),
                len = bytes.len(),
                "Extracting private key"
            );
            return container.extract_scalar(bytes);
        }
    }
    Err(CryptoError::InvalidPrivateKey(format!(
        "unrecognized {}-byte key container",
        bytes.len()
    )))
}
