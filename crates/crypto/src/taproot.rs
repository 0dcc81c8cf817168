//! BIP-340 tagged hashes and the BIP-341 output key tweak.
//!
//! Only the key-path tweak is supported (no script tree): the output key is
//! `lift_x(P) + int(tagged_hash("TapTweak", P.x)) * G`.

use crate::curve::{
    curve_rhs, point_add, scalar_multiply, sqrt_mod_p, Point, CURVE_ORDER, FIELD_PRIME, GENERATOR,
};
use crate::error::{CryptoError, Result};
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

/// `SHA256("TapTweak")`
pub const TAP_TWEAK_TAG_HASH: [u8; 32] = [
    0xe8, 0x0f, 0xe1, 0x63, 0x9c, 0x9c, 0xa0, 0x50, 0xe3, 0xaf, 0x1b, 0x39, 0xc1, 0x43, 0xc6, 0x3e,
    0x42, 0x9c, 0xbc, 0xeb, 0x15, 0xd9, 0x40, 0xfb, 0xb5, 0xc5, 0xa1, 0xf4, 0xaf, 0x57, 0xc5, 0xe9,
];

fn hash_with_tag_digest(tag_digest: &[u8; 32], data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(tag_digest);
    hasher.update(tag_digest);
    hasher.update(data);
    hasher.finalize().into()
}

/// `SHA256(SHA256(tag) ++ SHA256(tag) ++ data)`
pub fn tagged_hash(tag: &str, data: &[u8]) -> [u8; 32] {
    let tag_digest: [u8; 32] = Sha256::digest(tag.as_bytes()).into();
    hash_with_tag_digest(&tag_digest, data)
}

/// Recover the even-Y point with the X coordinate of `pubkey`.
///
/// Accepts an x-only key (32 bytes) or a serialized public key (33 or 65
/// bytes); only the X coordinate is used.
pub fn lift_x(pubkey: &[u8]) -> Result<Point> {
    let x_bytes = match (pubkey.len(), pubkey.first().copied()) {
        (32, _) => pubkey,
        (33, Some(0x02 | 0x03)) | (65, Some(0x04)) => &pubkey[1..33],
        (len, _) => {
            return Err(CryptoError::InvalidPoint(format!(
                "cannot take x coordinate of {}-byte key",
                len
            )))
        }
    };
    let p = &*FIELD_PRIME;
    let x = BigUint::from_bytes_be(x_bytes);
    if x >= *p {
        return Err(CryptoError::InvalidPoint("x is not a field element".to_string()));
    }
    let y = sqrt_mod_p(&curve_rhs(&x))
        .ok_or_else(|| CryptoError::InvalidPoint("no curve point for x".to_string()))?;
    let y = if y.bit(0) { p - &y } else { y };
    Ok(Point { x, y })
}

/// Compute the 32-byte Taproot output key for an internal key.
pub fn tweak_pubkey(pubkey: &[u8]) -> Result<[u8; 32]> {
    let internal = lift_x(pubkey)?;
    let tweak = hash_with_tag_digest(&TAP_TWEAK_TAG_HASH, &internal.x_bytes());
    let t = BigUint::from_bytes_be(&tweak);
    if t >= *CURVE_ORDER {
        return Err(CryptoError::InvalidPoint("tweak exceeds curve order".to_string()));
    }
    let tweak_point = scalar_multiply(&t, &GENERATOR);
    let output = point_add(Some(&internal), tweak_point.as_ref())
        .ok_or_else(|| CryptoError::InvalidPoint("tweaked key is infinity".to_string()))?;
    Ok(output.x_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{compress, derive_pubkey};

    fn from_hex32(s: &str) -> [u8; 32] {
        hex::decode(s).unwrap().try_into().unwrap()
    }

    #[test]
    fn test_tag_hash_constant() {
        let computed: [u8; 32] = Sha256::digest(b"TapTweak").into();
        assert_eq!(computed, TAP_TWEAK_TAG_HASH);
    }

    #[test]
    fn test_tagged_hash_uses_tag_twice() {
        let tag_digest: [u8; 32] = Sha256::digest(b"TapTweak").into();
        let mut preimage = Vec::new();
        preimage.extend_from_slice(&tag_digest);
        preimage.extend_from_slice(&tag_digest);
        preimage.extend_from_slice(b"abc");
        let expected: [u8; 32] = Sha256::digest(&preimage).into();
        assert_eq!(tagged_hash("TapTweak", b"abc"), expected);
    }

    #[test]
    fn test_bip86_first_key_vector() {
        let internal = from_hex32("cc8a4bc64d897bddc5fbc2f670f7a8ba0b386779106cf1223c6fc5d7cd6fc115");
        let output = tweak_pubkey(&internal).unwrap();
        assert_eq!(
            hex::encode(output),
            "a60869f0dbcf1dc659c9cecbaf8050135ea9e8cdc487053f1dc6880949dc684c"
        );
    }

    #[test]
    fn test_tweak_generator() {
        let mut one = [0u8; 32];
        one[31] = 1;
        let pubkey = derive_pubkey(&one).unwrap();
        assert_eq!(
            hex::encode(tweak_pubkey(&pubkey).unwrap()),
            "da4710964f7852695de2da025290e24af6d8c281de5a0b902b7135fd9fd74d21"
        );
    }

    #[test]
    fn test_tweak_is_deterministic_across_encodings() {
        let mut k = [0u8; 32];
        k[0] = 0x42;
        k[31] = 0x17;
        let full = derive_pubkey(&k).unwrap();
        let compressed = compress(&full).unwrap();
        let first = tweak_pubkey(&full).unwrap();
        assert_eq!(tweak_pubkey(&full).unwrap(), first);
        assert_eq!(tweak_pubkey(&compressed).unwrap(), first);
        assert_eq!(tweak_pubkey(&compressed[1..]).unwrap(), first);
    }

    #[test]
    fn test_lift_x_picks_even_y() {
        let mut k = [0u8; 32];
        k[31] = 3;
        let full = derive_pubkey(&k).unwrap();
        let lifted = lift_x(&full).unwrap();
        assert!(lifted.has_even_y());
        assert!(lifted.is_on_curve());
        assert_eq!(&lifted.x_bytes()[..], &full[1..33]);
    }

    #[test]
    fn test_lift_x_fails_without_curve_point() {
        let mut x = [0u8; 32];
        x[31] = 5;
        assert!(matches!(lift_x(&x), Err(CryptoError::InvalidPoint(_))));
        assert!(tweak_pubkey(&x).is_err());
    }

    #[test]
    fn test_lift_x_rejects_out_of_field() {
        assert!(lift_x(&[0xff; 32]).is_err());
        assert!(lift_x(&[0x02; 20]).is_err());
    }
}
