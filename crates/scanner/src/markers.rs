//! Byte markers around DER-encoded secp256k1 private keys.
//!
//! Legacy wallets stored keys as OpenSSL `ECPrivateKey` structures with
//! explicit curve parameters:
//!
//! ```text
//! 30 82 01 13 02 01 01 04 20 <32-byte key> a0 81 a5 30 81 a2 ...   uncompressed
//! 30 81 d3    02 01 01 04 20 <32-byte key> a0 81 85 30 81 82 ...   compressed
//! └──────── prefix ────────┘               └── post-key marker ─┘
//! ```
//!
//! The prefix locates a candidate; the post-key marker confirms it.

/// Private key length inside a container
pub const KEY_LEN: usize = 32;

/// Length of every post-key marker
pub const POST_MARKER_LEN: usize = 6;

/// Longest prefix marker
pub const MAX_PREFIX_LEN: usize = 9;

/// Longest window a match can capture
pub const MAX_WINDOW_LEN: usize = MAX_PREFIX_LEN + KEY_LEN + POST_MARKER_LEN;

/// A container prefix and the public key form it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMarker {
    /// Bytes preceding the private key
    pub prefix: &'static [u8],
    /// True for containers holding a compressed public key
    pub compressed: bool,
}

impl KeyMarker {
    /// Bytes from marker start through the end of the post-key marker.
    pub fn window_len(&self) -> usize {
        self.prefix.len() + KEY_LEN + POST_MARKER_LEN
    }
}

/// Known container prefixes.
pub static KEY_MARKERS: [KeyMarker; 2] = [
    KeyMarker {
        prefix: &[0x30, 0x82, 0x01, 0x13, 0x02, 0x01, 0x01, 0x04, 0x20],
        compressed: false,
    },
    KeyMarker {
        prefix: &[0x30, 0x81, 0xd3, 0x02, 0x01, 0x01, 0x04, 0x20],
        compressed: true,
    },
];

/// Known post-key markers.
pub const POST_KEY_MARKERS: [[u8; POST_MARKER_LEN]; 2] = [
    [0xa0, 0x81, 0xa5, 0x30, 0x81, 0xa2],
    [0xa0, 0x81, 0x85, 0x30, 0x81, 0x82],
];

/// The marker starting at `pos`, if any.
pub fn marker_at(buf: &[u8], pos: usize) -> Option<&'static KeyMarker> {
    let tail = buf.get(pos..)?;
    KEY_MARKERS.iter().find(|m| tail.starts_with(m.prefix))
}

/// True if any complete marker lies inside `buf`.
pub fn contains_marker(buf: &[u8]) -> bool {
    buf.iter()
        .enumerate()
        .filter(|(_, b)| **b == 0x30)
        .any(|(i, _)| marker_at(buf, i).is_some())
}

/// True if `trailing` starts with a known post-key marker.
pub fn is_post_key_marker(trailing: &[u8]) -> bool {
    POST_KEY_MARKERS.iter().any(|m| trailing.starts_with(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_lengths() {
        let longest = KEY_MARKERS.iter().map(|m| m.prefix.len()).max();
        assert_eq!(longest, Some(MAX_PREFIX_LEN));
        assert_eq!(KEY_MARKERS[0].window_len(), MAX_WINDOW_LEN);
        assert_eq!(KEY_MARKERS[1].window_len(), MAX_WINDOW_LEN - 1);
    }

    #[test]
    fn test_marker_at() {
        let mut buf = vec![0u8; 4];
        buf.extend_from_slice(KEY_MARKERS[1].prefix);
        assert!(marker_at(&buf, 3).is_none());
        assert_eq!(marker_at(&buf, 4), Some(&KEY_MARKERS[1]));
        assert!(marker_at(&buf, 100).is_none());
    }

    #[test]
    fn test_contains_marker_needs_whole_prefix() {
        let prefix = KEY_MARKERS[0].prefix;
        assert!(contains_marker(prefix));
        assert!(!contains_marker(&prefix[..prefix.len() - 1]));
        assert!(!contains_marker(&prefix[1..]));
    }

    #[test]
    fn test_post_key_marker() {
        assert!(is_post_key_marker(&[0xa0, 0x81, 0x85, 0x30, 0x81, 0x82, 0x00]));
        assert!(!is_post_key_marker(&[0xa0, 0x81, 0x85]));
        assert!(!is_post_key_marker(&[0u8; 6]));
    }
}
