//! secp256k1 affine point arithmetic.
//!
//! Points are affine `(x, y)` pairs over the field `P`; `None` stands for
//! the point at infinity. Inversion uses Fermat's little theorem
//! (`a^(P-2) mod P`) and scalar multiplication is plain double-and-add over
//! the bits of the scalar, least significant first.
//!
//! This is reconstruction code, not signing code: it is not constant time.
//!
//! # Serialized forms
//!
//! ```text
//! uncompressed  ┌──────┬──────────┬──────────┐
//!               │ 0x04 │ X (32)   │ Y (32)   │
//!               └──────┴──────────┴──────────┘
//! compressed    ┌────────────┬──────────┐
//!               │ 0x02/0x03  │ X (32)   │    0x02 = even Y, 0x03 = odd Y
//!               └────────────┴──────────┘
//! ```

use crate::error::{CryptoError, Result};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use once_cell::sync::Lazy;

const FIELD_PRIME_BYTES: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe, 0xff, 0xff, 0xfc, 0x2f,
];

const CURVE_ORDER_BYTES: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];

const GENERATOR_X_BYTES: [u8; 32] = [
    0x79, 0xbe, 0x66, 0x7e, 0xf9, 0xdc, 0xbb, 0xac, 0x55, 0xa0, 0x62, 0x95, 0xce, 0x87, 0x0b, 0x07,
    0x02, 0x9b, 0xfc, 0xdb, 0x2d, 0xce, 0x28, 0xd9, 0x59, 0xf2, 0x81, 0x5b, 0x16, 0xf8, 0x17, 0x98,
];

const GENERATOR_Y_BYTES: [u8; 32] = [
    0x48, 0x3a, 0xda, 0x77, 0x26, 0xa3, 0xc4, 0x65, 0x5d, 0xa4, 0xfb, 0xfc, 0x0e, 0x11, 0x08, 0xa8,
    0xfd, 0x17, 0xb4, 0x48, 0xa6, 0x85, 0x54, 0x19, 0x9c, 0x47, 0xd0, 0x8f, 0xfb, 0x10, 0xd4, 0xb8,
];

/// Curve constant `b` in `y^2 = x^3 + b`
const CURVE_B: u32 = 7;

/// Field prime P
pub static FIELD_PRIME: Lazy<BigUint> = Lazy::new(|| BigUint::from_bytes_be(&FIELD_PRIME_BYTES));

/// Group order N
pub static CURVE_ORDER: Lazy<BigUint> = Lazy::new(|| BigUint::from_bytes_be(&CURVE_ORDER_BYTES));

/// Generator point G
pub static GENERATOR: Lazy<Point> = Lazy::new(|| Point {
    x: BigUint::from_bytes_be(&GENERATOR_X_BYTES),
    y: BigUint::from_bytes_be(&GENERATOR_Y_BYTES),
});

/// `(P + 1) / 4`, the square-root exponent (valid because P ≡ 3 mod 4)
static SQRT_EXPONENT: Lazy<BigUint> =
    Lazy::new(|| (&*FIELD_PRIME + BigUint::one()) >> 2usize);

/// `P - 2`, the inversion exponent
static INVERSE_EXPONENT: Lazy<BigUint> = Lazy::new(|| &*FIELD_PRIME - 2u32);

/// An affine point on secp256k1 (never the point at infinity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    /// X coordinate, reduced mod P
    pub x: BigUint,
    /// Y coordinate, reduced mod P
    pub y: BigUint,
}

impl Point {
    /// The generator G.
    pub fn generator() -> Point {
        GENERATOR.clone()
    }

    /// True if `y^2 == x^3 + 7 (mod P)`.
    pub fn is_on_curve(&self) -> bool {
        let p = &*FIELD_PRIME;
        if self.x >= *p || self.y >= *p {
            return false;
        }
        (&self.y * &self.y) % p == curve_rhs(&self.x)
    }

    /// True if Y is even.
    pub fn has_even_y(&self) -> bool {
        !self.y.bit(0)
    }

    /// X coordinate as 32 big-endian bytes.
    pub fn x_bytes(&self) -> [u8; 32] {
        to_bytes32(&self.x)
    }

    /// Y coordinate as 32 big-endian bytes.
    pub fn y_bytes(&self) -> [u8; 32] {
        to_bytes32(&self.y)
    }
}

/// Left-pad a value below 2^256 to 32 big-endian bytes.
pub(crate) fn to_bytes32(v: &BigUint) -> [u8; 32] {
    let raw = v.to_bytes_be();
    let mut out = [0u8; 32];
    let take = raw.len().min(32);
    out[32 - take..].copy_from_slice(&raw[raw.len() - take..]);
    out
}

/// `x^3 + 7 mod P`
pub(crate) fn curve_rhs(x: &BigUint) -> BigUint {
    let p = &*FIELD_PRIME;
    (x.modpow(&BigUint::from(3u32), p) + CURVE_B) % p
}

/// Modular square root mod P, if one exists.
pub(crate) fn sqrt_mod_p(c: &BigUint) -> Option<BigUint> {
    let p = &*FIELD_PRIME;
    let y = c.modpow(&SQRT_EXPONENT, p);
    if (&y * &y) % p == c % p {
        Some(y)
    } else {
        None
    }
}

fn inverse(a: &BigUint) -> BigUint {
    a.modpow(&INVERSE_EXPONENT, &FIELD_PRIME)
}

fn sub_mod(a: &BigUint, b: &BigUint) -> BigUint {
    let p = &*FIELD_PRIME;
    ((a % p) + p - (b % p)) % p
}

/// Complete the addition once the slope is known.
fn finish(slope: BigUint, a: &Point, other_x: &BigUint) -> Point {
    let p = &*FIELD_PRIME;
    let x3 = sub_mod(&sub_mod(&((&slope * &slope) % p), &a.x), other_x);
    let y3 = sub_mod(&((&slope * sub_mod(&a.x, &x3)) % p), &a.y);
    Point { x: x3, y: y3 }
}

/// Double a point.
pub fn point_double(a: Option<&Point>) -> Option<Point> {
    let a = a?;
    if a.y.is_zero() {
        return None;
    }
    let p = &*FIELD_PRIME;
    let numerator = (BigUint::from(3u32) * &a.x * &a.x) % p;
    let denominator = (BigUint::from(2u32) * &a.y) % p;
    let slope = (numerator * inverse(&denominator)) % p;
    Some(finish(slope, a, &a.x))
}

/// Add two points.
pub fn point_add(a: Option<&Point>, b: Option<&Point>) -> Option<Point> {
    match (a, b) {
        (None, None) => None,
        (Some(a), None) => Some(a.clone()),
        (None, Some(b)) => Some(b.clone()),
        (Some(a), Some(b)) => {
            if a.x == b.x {
                if a.y == b.y {
                    return point_double(Some(a));
                }
                return None;
            }
            let p = &*FIELD_PRIME;
            let slope = (sub_mod(&b.y, &a.y) * inverse(&sub_mod(&b.x, &a.x))) % p;
            Some(finish(slope, a, &b.x))
        }
    }
}

/// Multiply a point by a scalar.
pub fn scalar_multiply(k: &BigUint, point: &Point) -> Option<Point> {
    let mut result: Option<Point> = None;
    let mut addend = Some(point.clone());
    for byte in k.to_bytes_le() {
        for bit in 0..8 {
            if (byte >> bit) & 1 == 1 {
                result = point_add(result.as_ref(), addend.as_ref());
            }
            addend = point_double(addend.as_ref());
        }
    }
    result
}

/// Interpret 32 bytes as a scalar in `[1, N)`.
pub(crate) fn scalar_from_bytes(private_key: &[u8; 32]) -> Result<BigUint> {
    let k = BigUint::from_bytes_be(private_key);
    if k.is_zero() {
        return Err(CryptoError::InvalidPrivateKey("scalar is zero".to_string()));
    }
    if k >= *CURVE_ORDER {
        return Err(CryptoError::InvalidPrivateKey(
            "scalar is not below the curve order".to_string(),
        ));
    }
    Ok(k)
}

/// Serialize a point as `0x04 ++ X ++ Y`.
pub fn serialize_uncompressed(point: &Point) -> [u8; 65] {
    let mut out = [0u8; 65];
    out[0] = 0x04;
    out[1..33].copy_from_slice(&point.x_bytes());
    out[33..65].copy_from_slice(&point.y_bytes());
    out
}

/// Derive the 65-byte uncompressed public key for a private scalar.
pub fn derive_pubkey(private_key: &[u8; 32]) -> Result<[u8; 65]> {
    let k = scalar_from_bytes(private_key)?;
    let point = scalar_multiply(&k, &GENERATOR).ok_or_else(|| {
        CryptoError::InvalidPrivateKey("scalar maps to the point at infinity".to_string())
    })?;
    Ok(serialize_uncompressed(&point))
}

/// Compress a public key. Already-compressed keys are returned unchanged.
pub fn compress(pubkey: &[u8]) -> Result<[u8; 33]> {
    let mut out = [0u8; 33];
    match (pubkey.len(), pubkey.first().copied()) {
        (33, Some(0x02 | 0x03)) => out.copy_from_slice(pubkey),
        (65, Some(0x04)) => {
            out[0] = if pubkey[64] & 1 == 0 { 0x02 } else { 0x03 };
            out[1..].copy_from_slice(&pubkey[1..33]);
        }
        (len, _) => {
            return Err(CryptoError::InvalidPoint(format!(
                "cannot compress {}-byte public key",
                len
            )))
        }
    }
    Ok(out)
}

/// Decompress a public key to its 65-byte form.
///
/// Uncompressed input is validated and returned unchanged.
pub fn decompress(pubkey: &[u8]) -> Result<[u8; 65]> {
    parse_point(pubkey).map(|p| serialize_uncompressed(&p))
}

/// Parse a 33- or 65-byte public key into a point on the curve.
pub fn parse_point(pubkey: &[u8]) -> Result<Point> {
    let p = &*FIELD_PRIME;
    match (pubkey.len(), pubkey.first().copied()) {
        (33, Some(prefix @ (0x02 | 0x03))) => {
            let x = BigUint::from_bytes_be(&pubkey[1..]);
            if x >= *p {
                return Err(CryptoError::InvalidPoint("x is not a field element".to_string()));
            }
            let y = sqrt_mod_p(&curve_rhs(&x))
                .ok_or_else(|| CryptoError::InvalidPoint("x has no square root".to_string()))?;
            let want_odd = prefix == 0x03;
            let y = if y.bit(0) == want_odd { y } else { p - &y };
            Ok(Point { x, y: y % p })
        }
        (65, Some(0x04)) => {
            let point = Point {
                x: BigUint::from_bytes_be(&pubkey[1..33]),
                y: BigUint::from_bytes_be(&pubkey[33..65]),
            };
            if !point.is_on_curve() {
                return Err(CryptoError::InvalidPoint("point is not on the curve".to_string()));
            }
            Ok(point)
        }
        (len, _) => Err(CryptoError::InvalidPoint(format!(
            "unrecognized {}-byte public key encoding",
            len
        ))),
    }
}

/// Check that `pubkey` (either form) is the public key of `private_key`.
pub fn pubkey_matches_scalar(pubkey: &[u8], private_key: &[u8; 32]) -> Result<bool> {
    let derived = derive_pubkey(private_key)?;
    Ok(match pubkey.len() {
        65 => pubkey == derived.as_slice(),
        33 => pubkey == compress(&derived)?.as_slice(),
        _ => false,
    })
}
