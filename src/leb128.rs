//! LEB128 variable-length integer encoding/decoding.
//!
//! Every varint on the wire is an unsigned 64-bit quantity encoded 7 bits
//! per byte, least-significant group first, with the continuation bit set on
//! every non-final byte. Signed values travel as their two's complement
//! reinterpretation; zigzag is a layer on top of that.

// This module uses `as` casts which have been reviewed for correctness.
#![allow(clippy::as_conversions)]

use crate::error::DecodeErrorKind;

/// Maximum number of bytes a LEB128-encoded `u64` occupies.
pub const MAX_VARINT_LEN: usize = 10;

/// Encode `value` into `out`, returning the number of bytes written.
#[inline]
pub fn encode_into(mut value: u64, out: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut i = 0;
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out[i] = byte;
            return i + 1;
        }
        out[i] = byte | 0x80;
        i += 1;
    }
}

/// Decode a varint from the front of `data`.
///
/// Returns the decoded value and the number of bytes consumed. Fails with
/// buffer-underflow if `data` ends while the continuation bit is still set,
/// and with an invalid-varint error if the encoding exceeds 64 bits.
#[inline]
pub fn decode_from(data: &[u8]) -> Result<(u64, usize), DecodeErrorKind> {
    let mut value = 0u64;
    for i in 0..MAX_VARINT_LEN {
        let Some(&byte) = data.get(i) else {
            return Err(DecodeErrorKind::UnexpectedEndOfBuffer);
        };
        // The tenth byte only contributes one bit; anything else either
        // overflows u64 or continues past the maximum length.
        if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
            return Err(DecodeErrorKind::InvalidVarint);
        }
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte < 0x80 {
            return Ok((value, i + 1));
        }
    }
    Err(DecodeErrorKind::InvalidVarint)
}

/// Exact encoded length of `value` without encoding it.
///
/// LEB128 carries 7 payload bits per byte, so the length is
/// `ceil(significant_bits / 7)` with a minimum of one byte for zero. The
/// `| 1` keeps the zero case on the same arithmetic path.
#[inline]
pub fn varint_len_u64(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros();
    ((bits + 6) / 7) as usize
}

/// Encoded length of a signed value under two's complement reinterpretation.
///
/// Negative values always occupy the full ten bytes.
#[inline]
pub fn varint_len(value: i64) -> usize {
    varint_len_u64(value as u64)
}

/// Map a signed value to unsigned so small magnitudes stay small.
#[inline]
pub const fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Reverse of [`zigzag_encode`].
#[inline]
pub const fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ (-((value & 1) as i64))
}

/// Encoded length of `value` under zigzag-then-varint encoding.
#[inline]
pub fn zigzag_len(value: i64) -> usize {
    varint_len_u64(zigzag_encode(value))
}
