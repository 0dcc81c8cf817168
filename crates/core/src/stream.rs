//! Binary stream codec for wallet records.
//!
//! Every wallet record key and value is a flat little-endian byte string made
//! of fixed-width integers and compact-size framed byte strings.
//!
//! # Compact-size layout
//!
//! ```text
//! value < 253          ┌──────────┐
//!                      │ value (1)│
//!                      └──────────┘
//! value <= 0xFFFF      ┌──────┬──────────────┐
//!                      │ 0xFD │ u16 LE (2)   │
//!                      └──────┴──────────────┘
//! value <= 0xFFFFFFFF  ┌──────┬──────────────┐
//!                      │ 0xFE │ u32 LE (4)   │
//!                      └──────┴──────────────┘
//! otherwise            ┌──────┬──────────────┐
//!                      │ 0xFF │ u64 LE (8)   │
//!                      └──────┴──────────────┘
//! ```
//!
//! A "string" is a compact-size length followed by that many raw bytes.
//!
//! Reads never panic and never return partial data: running off the end of
//! the buffer yields [`StreamError::Truncated`] and leaves the cursor where
//! it was.

use crate::error::StreamError;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Escape byte for a following u16 length
const COMPACT_U16: u8 = 253;
/// Escape byte for a following u32 length
const COMPACT_U32: u8 = 254;
/// Escape byte for a following u64 length
const COMPACT_U64: u8 = 255;

/// Number of bytes `write_compact_size(n)` produces.
pub fn compact_size_len(n: u64) -> usize {
    if n < COMPACT_U16 as u64 {
        1
    } else if n <= u16::MAX as u64 {
        3
    } else if n <= u32::MAX as u64 {
        5
    } else {
        9
    }
}

/// Sequential reader over an owned byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteCursor {
    data: Vec<u8>,
    pos: usize,
}

impl ByteCursor {
    /// Wrap an owned buffer.
    pub fn new(data: Vec<u8>) -> Self {
        ByteCursor { data, pos: 0 }
    }

    /// Copy a borrowed slice into a new cursor.
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }

    /// Current read position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True once every byte has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&[u8], StreamError> {
        if n > self.remaining() {
            return Err(StreamError::Truncated {
                offset: self.pos,
                wanted: n,
                available: self.remaining(),
            });
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.data[start..start + n])
    }

    /// Read exactly `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, StreamError> {
        self.take(n).map(|b| b.to_vec())
    }

    /// Read a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], StreamError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read a 32-byte hash in stored (little-endian) order.
    pub fn read_hash256(&mut self) -> Result<[u8; 32], StreamError> {
        self.read_array::<32>()
    }

    /// Read everything that is left.
    pub fn read_rest(&mut self) -> Vec<u8> {
        let rest = self.data[self.pos..].to_vec();
        self.pos = self.data.len();
        rest
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, StreamError> {
        Ok(self.take(1)?[0])
    }

    /// Read a boolean (any non-zero byte is true).
    pub fn read_bool(&mut self) -> Result<bool, StreamError> {
        Ok(self.read_u8()? != 0)
    }

    /// Read a little-endian u16.
    pub fn read_u16(&mut self) -> Result<u16, StreamError> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    /// Read a big-endian u16 (network byte order, used for ports).
    pub fn read_u16_be(&mut self) -> Result<u16, StreamError> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    /// Read a little-endian u32.
    pub fn read_u32(&mut self) -> Result<u32, StreamError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    /// Read a little-endian u64.
    pub fn read_u64(&mut self) -> Result<u64, StreamError> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    /// Read a little-endian i16.
    pub fn read_i16(&mut self) -> Result<i16, StreamError> {
        Ok(LittleEndian::read_i16(self.take(2)?))
    }

    /// Read a little-endian i32.
    pub fn read_i32(&mut self) -> Result<i32, StreamError> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    /// Read a little-endian i64.
    pub fn read_i64(&mut self) -> Result<i64, StreamError> {
        Ok(LittleEndian::read_i64(self.take(8)?))
    }

    /// Read a compact-size integer.
    ///
    /// On truncation inside the escaped width the cursor is rewound to the
    /// escape byte.
    pub fn read_compact_size(&mut self) -> Result<u64, StreamError> {
        let start = self.pos;
        let marker = self.read_u8()?;
        let value = match marker {
            COMPACT_U16 => self.read_u16().map(u64::from),
            COMPACT_U32 => self.read_u32().map(u64::from),
            COMPACT_U64 => self.read_u64(),
            small => Ok(u64::from(small)),
        };
        if value.is_err() {
            self.pos = start;
        }
        value
    }

    /// Read a compact-size length and return it as `usize`.
    pub fn read_length(&mut self) -> Result<usize, StreamError> {
        let n = self.read_compact_size()?;
        usize::try_from(n).map_err(|_| StreamError::Oversized(n))
    }

    /// Read a compact-size prefixed byte string.
    pub fn read_string(&mut self) -> Result<Vec<u8>, StreamError> {
        let start = self.pos;
        let len = self.read_length()?;
        match self.read_bytes(len) {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                self.pos = start;
                Err(e)
            }
        }
    }

    /// Read a compact-size prefixed string and decode it lossily as UTF-8.
    pub fn read_text(&mut self) -> Result<String, StreamError> {
        let raw = self.read_string()?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}

/// Append-only writer producing the same layout [`ByteCursor`] reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Borrow the written bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer and return the buffer.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    /// Append raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Append a single byte.
    pub fn write_u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    /// Append a boolean as one byte.
    pub fn write_bool(&mut self, v: bool) -> &mut Self {
        self.write_u8(u8::from(v))
    }

    /// Append a little-endian u16.
    pub fn write_u16(&mut self, v: u16) -> &mut Self {
        let mut tmp = [0u8; 2];
        LittleEndian::write_u16(&mut tmp, v);
        self.write_bytes(&tmp)
    }

    /// Append a big-endian u16.
    pub fn write_u16_be(&mut self, v: u16) -> &mut Self {
        let mut tmp = [0u8; 2];
        BigEndian::write_u16(&mut tmp, v);
        self.write_bytes(&tmp)
    }

    /// Append a little-endian u32.
    pub fn write_u32(&mut self, v: u32) -> &mut Self {
        let mut tmp = [0u8; 4];
        LittleEndian::write_u32(&mut tmp, v);
        self.write_bytes(&tmp)
    }

    /// Append a little-endian u64.
    pub fn write_u64(&mut self, v: u64) -> &mut Self {
        let mut tmp = [0u8; 8];
        LittleEndian::write_u64(&mut tmp, v);
        self.write_bytes(&tmp)
    }

    /// Append a little-endian i16.
    pub fn write_i16(&mut self, v: i16) -> &mut Self {
        let mut tmp = [0u8; 2];
        LittleEndian::write_i16(&mut tmp, v);
        self.write_bytes(&tmp)
    }

    /// Append a little-endian i32.
    pub fn write_i32(&mut self, v: i32) -> &mut Self {
        let mut tmp = [0u8; 4];
        LittleEndian::write_i32(&mut tmp, v);
        self.write_bytes(&tmp)
    }

    /// Append a little-endian i64.
    pub fn write_i64(&mut self, v: i64) -> &mut Self {
        let mut tmp = [0u8; 8];
        LittleEndian::write_i64(&mut tmp, v);
        self.write_bytes(&tmp)
    }

    /// Append a compact-size integer using the shortest form.
    pub fn write_compact_size(&mut self, n: u64) -> &mut Self {
        match compact_size_len(n) {
            1 => self.write_u8(n as u8),
            3 => self.write_u8(COMPACT_U16).write_u16(n as u16),
            5 => self.write_u8(COMPACT_U32).write_u32(n as u32),
            _ => self.write_u8(COMPACT_U64).write_u64(n),
        }
    }

    /// Append a compact-size prefixed byte string.
    pub fn write_string(&mut self, bytes: &[u8]) -> &mut Self {
        self.write_compact_size(bytes.len() as u64).write_bytes(bytes)
    }
}
