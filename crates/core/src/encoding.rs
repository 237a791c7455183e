//! Variable-length signed integer encoding
//!
//! Integers are zig-zag mapped to unsigned (`0, -1, 1, -2, ...` become
//! `0, 1, 2, 3, ...`) and then written 7 bits per byte, least significant
//! group first, with the high bit set on every byte except the last. The
//! output is byte-for-byte identical to Go's `binary.PutVarint`, which is the
//! wire form of both row identifiers and `Int64` field values.
//!
//! ## Prefix freedom
//!
//! Only the last byte of an encoding is below `0x80`, so no encoding is a
//! prefix of another and [`decode_varint`] reports exactly how many bytes
//! one value occupies. That last byte may be any value below `0x80`,
//! including the row separator `0x2D`.
//!
//! ## Ordering
//!
//! The encoding is little-endian: byte order of encoded values only matches
//! numeric order while they fit in a single byte (`-64..=63`).

use crate::error::{Error, Result};

/// Maximum encoded length of a 64-bit value.
pub const MAX_VARINT_LEN: usize = 10;

/// Encode `value` into its shortest varint form.
pub fn encode_int64(value: i64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(MAX_VARINT_LEN);
    put_int64(&mut buf, value);
    buf
}

/// Append the varint form of `value` to `buf`, returning the bytes written.
pub fn put_int64(buf: &mut Vec<u8>, value: i64) -> usize {
    let mut ux = ((value as u64) << 1) ^ ((value >> 63) as u64);
    let start = buf.len();
    while ux >= 0x80 {
        buf.push((ux as u8) | 0x80);
        ux >>= 7;
    }
    buf.push(ux as u8);
    buf.len() - start
}

/// Decode a varint from the start of `buf`, returning the value and the
/// number of bytes consumed.
///
/// # Errors
///
/// Returns [`Error::Overflow`] if the input is empty, truncated, longer than
/// [`MAX_VARINT_LEN`] bytes, or encodes a value above 64 bits.
pub fn decode_varint(buf: &[u8]) -> Result<(i64, usize)> {
    let mut ux: u64 = 0;
    let mut shift = 0u32;

    for (i, &b) in buf.iter().enumerate() {
        if i == MAX_VARINT_LEN {
            return Err(Error::Overflow);
        }
        if b < 0x80 {
            if i == MAX_VARINT_LEN - 1 && b > 1 {
                return Err(Error::Overflow);
            }
            ux |= u64::from(b) << shift;
            let mut x = (ux >> 1) as i64;
            if ux & 1 != 0 {
                x = !x;
            }
            return Ok((x, i + 1));
        }
        ux |= u64::from(b & 0x7f) << shift;
        shift += 7;
    }

    // Ran out of input before the terminating byte.
    Err(Error::Overflow)
}

/// Decode an `Int64` field value. Trailing bytes after the varint are ignored.
pub fn decode_int64(buf: &[u8]) -> Result<i64> {
    decode_varint(buf).map(|(v, _)| v)
}
