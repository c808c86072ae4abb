//! A seekable byte buffer speaking every protobuf wire primitive.
//!
//! [`WireBuffer`] owns a byte region with a single read/write cursor and a
//! high watermark of bytes ever written. Owned buffers grow on demand;
//! buffers created over caller-supplied bytes keep fixed bounds and fail
//! with a buffer-overflow condition when a write would exceed them.

// Signed/unsigned reinterpretation casts in this module have been reviewed
// for correctness.
#![allow(clippy::as_conversions)]

use bytes::Bytes;

use crate::error::{DecodeError, DecodeErrorKind, EncodeError};
use crate::leb128::{self, MAX_VARINT_LEN};
use crate::wire::{FieldKey, WireType};

/// Initial allocation for growable buffers.
const MIN_CAPACITY: usize = 64;

/// A byte region with a read/write cursor.
///
/// Invariants: `offset <= capacity` and `written <= capacity` always hold;
/// after any write, `written >= offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireBuffer {
    data: Vec<u8>,
    offset: usize,
    written: usize,
    growable: bool,
}

impl WireBuffer {
    /// Create an empty growable buffer.
    pub fn new() -> Self {
        WireBuffer {
            data: Vec::new(),
            offset: 0,
            written: 0,
            growable: true,
        }
    }

    /// Create a growable buffer with `capacity` pre-allocated zero bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        WireBuffer {
            data: vec![0; capacity],
            offset: 0,
            written: 0,
            growable: true,
        }
    }

    /// Create a buffer of `capacity` zero bytes that refuses to grow.
    pub fn fixed(capacity: usize) -> Self {
        WireBuffer {
            data: vec![0; capacity],
            offset: 0,
            written: 0,
            growable: false,
        }
    }

    /// Take ownership of `data` as a growable buffer positioned at the
    /// start, with every byte counting as written.
    pub fn from_vec(data: Vec<u8>) -> Self {
        let written = data.len();
        WireBuffer {
            data,
            offset: 0,
            written,
            growable: true,
        }
    }

    /// Copy `bytes` into a fixed-bounds buffer positioned at the start.
    ///
    /// This models a borrowed slice: reads and in-place writes stay inside
    /// the original bounds, and a write past the end fails.
    pub fn from_slice(bytes: &[u8]) -> Self {
        WireBuffer {
            data: bytes.to_vec(),
            offset: 0,
            written: bytes.len(),
            growable: false,
        }
    }

    /// Parse a hex string into a fixed-bounds buffer.
    pub fn from_hex(hex_str: &str) -> Result<Self, DecodeError> {
        let data = hex::decode(hex_str).map_err(|err| {
            DecodeError::new(DecodeErrorKind::InvalidHex {
                message: err.to_string(),
            })
        })?;
        let written = data.len();
        Ok(WireBuffer {
            data,
            offset: 0,
            written,
            growable: false,
        })
    }

    /// Current cursor position.
    #[inline]
    pub fn tell(&self) -> usize {
        self.offset
    }

    /// Move the cursor to `offset`.
    pub fn seek(&mut self, offset: usize) -> Result<(), DecodeError> {
        if offset > self.data.len() {
            return Err(DecodeError::new(DecodeErrorKind::OffsetOutOfBounds {
                offset,
                capacity: self.data.len(),
            }));
        }
        self.offset = offset;
        Ok(())
    }

    /// Length of the underlying region.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// High watermark of bytes ever written.
    #[inline]
    pub fn written_len(&self) -> usize {
        self.written
    }

    /// Bytes left between the cursor and the end of the region.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    #[inline]
    pub fn has_remaining(&self) -> bool {
        self.offset < self.data.len()
    }

    /// Whether written payload remains ahead of the cursor.
    ///
    /// Unlike [`has_remaining`](Self::has_remaining) this ignores spare
    /// capacity a growable buffer has allocated past its payload.
    #[inline]
    pub fn has_unread(&self) -> bool {
        self.offset < self.written
    }

    /// The full underlying region, including never-written capacity.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// The region up to the written high watermark.
    #[inline]
    pub fn written_bytes(&self) -> &[u8] {
        &self.data[..self.written]
    }

    /// A copy of this buffer limited to the written payload, positioned at
    /// the start.
    pub fn to_shrunk(&self) -> WireBuffer {
        WireBuffer {
            data: self.data[..self.written].to_vec(),
            offset: 0,
            written: self.written,
            growable: false,
        }
    }

    /// Consume the buffer, freezing the written payload.
    pub fn into_bytes(mut self) -> Bytes {
        self.data.truncate(self.written);
        Bytes::from(self.data)
    }

    /// Hex rendition of the written payload.
    pub fn to_hex(&self) -> String {
        hex::encode(self.written_bytes())
    }

    /// Split off a sub-buffer over the next `n` bytes, advancing the cursor
    /// past them. The sub-buffer is itself seekable with capacity `n`.
    pub fn slice(&mut self, n: usize) -> Result<WireBuffer, DecodeError> {
        let bytes = self.take(n)?.to_vec();
        Ok(WireBuffer {
            data: bytes,
            offset: 0,
            written: n,
            growable: false,
        })
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    fn ensure(&mut self, additional: usize) -> Result<(), EncodeError> {
        let needed = self
            .offset
            .checked_add(additional)
            .ok_or_else(|| EncodeError::buffer_overflow(usize::MAX, self.data.len()))?;
        if needed <= self.data.len() {
            return Ok(());
        }
        if !self.growable {
            return Err(EncodeError::buffer_overflow(needed, self.data.len()));
        }
        let new_capacity = needed.max(self.data.len() * 2).max(MIN_CAPACITY);
        self.data.resize(new_capacity, 0);
        Ok(())
    }

    /// Copy raw bytes at the cursor with no framing.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.ensure(bytes.len())?;
        self.data[self.offset..self.offset + bytes.len()].copy_from_slice(bytes);
        self.offset += bytes.len();
        if self.offset > self.written {
            self.written = self.offset;
        }
        Ok(())
    }

    pub fn write_u8(&mut self, byte: u8) -> Result<(), EncodeError> {
        self.write_raw(&[byte])
    }

    /// Write an unsigned varint.
    pub fn write_varint(&mut self, value: u64) -> Result<(), EncodeError> {
        let mut scratch = [0u8; MAX_VARINT_LEN];
        let len = leb128::encode_into(value, &mut scratch);
        self.write_raw(&scratch[..len])
    }

    /// Write a signed varint under two's complement reinterpretation.
    ///
    /// Negative values always occupy ten bytes.
    pub fn write_signed_varint(&mut self, value: i64) -> Result<(), EncodeError> {
        self.write_varint(value as u64)
    }

    /// Write a zigzag-encoded signed varint.
    pub fn write_zigzag(&mut self, value: i64) -> Result<(), EncodeError> {
        self.write_varint(leb128::zigzag_encode(value))
    }

    pub fn write_fixed32(&mut self, value: u32) -> Result<(), EncodeError> {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_fixed64(&mut self, value: u64) -> Result<(), EncodeError> {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_sfixed32(&mut self, value: i32) -> Result<(), EncodeError> {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_sfixed64(&mut self, value: i64) -> Result<(), EncodeError> {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_float(&mut self, value: f32) -> Result<(), EncodeError> {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_double(&mut self, value: f64) -> Result<(), EncodeError> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Write a length-prefixed byte block.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        if u32::try_from(bytes.len()).is_err() {
            return Err(EncodeError::payload_too_long(bytes.len()));
        }
        self.write_varint(bytes.len() as u64)?;
        self.write_raw(bytes)
    }

    /// Write a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) -> Result<(), EncodeError> {
        self.write_bytes(value.as_bytes())
    }

    /// Write a field key, validating the index range and rejecting group
    /// wire types.
    pub fn write_key(&mut self, index: u32, wire_type: WireType) -> Result<(), EncodeError> {
        if wire_type.is_group() {
            return Err(EncodeError::new(
                crate::error::EncodeErrorKind::DeprecatedGroupEncoding,
            ));
        }
        let key =
            FieldKey::new(index, wire_type).map_err(|_| EncodeError::tag_out_of_range(index))?;
        self.write_varint(u64::from(key.raw()))
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    fn take(&mut self, n: usize) -> Result<&[u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::unexpected_end_of_buffer().at_offset(self.offset));
        }
        let start = self.offset;
        self.offset += n;
        Ok(&self.data[start..start + n])
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    /// Read an unsigned varint.
    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let start = self.offset;
        let (value, consumed) = leb128::decode_from(&self.data[self.offset..])
            .map_err(|kind| DecodeError::new(kind).at_offset(start))?;
        self.offset += consumed;
        Ok(value)
    }

    /// Read a varint and reinterpret it as two's complement.
    pub fn read_signed_varint(&mut self) -> Result<i64, DecodeError> {
        Ok(self.read_varint()? as i64)
    }

    /// Read a zigzag-encoded signed varint.
    pub fn read_zigzag(&mut self) -> Result<i64, DecodeError> {
        Ok(leb128::zigzag_decode(self.read_varint()?))
    }

    pub fn read_fixed32(&mut self) -> Result<u32, DecodeError> {
        let mut word = [0u8; 4];
        word.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(word))
    }

    pub fn read_fixed64(&mut self) -> Result<u64, DecodeError> {
        let mut word = [0u8; 8];
        word.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(word))
    }

    pub fn read_sfixed32(&mut self) -> Result<i32, DecodeError> {
        Ok(self.read_fixed32()? as i32)
    }

    pub fn read_sfixed64(&mut self) -> Result<i64, DecodeError> {
        Ok(self.read_fixed64()? as i64)
    }

    pub fn read_float(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_bits(self.read_fixed32()?))
    }

    pub fn read_double(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_bits(self.read_fixed64()?))
    }

    /// Read the length prefix of a length-delimited payload.
    pub fn read_len(&mut self) -> Result<usize, DecodeError> {
        let start = self.offset;
        let len = self.read_varint()?;
        usize::try_from(len).map_err(|_| DecodeError::length_overflow(len).at_offset(start))
    }

    /// Read a length-prefixed byte block.
    pub fn read_bytes(&mut self) -> Result<Bytes, DecodeError> {
        let len = self.read_len()?;
        Ok(Bytes::copy_from_slice(self.take(len)?))
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let start = self.offset;
        let len = self.read_len()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| DecodeError::new(DecodeErrorKind::InvalidUtf8).at_offset(start))
    }

    /// Read a field key.
    pub fn read_key(&mut self) -> Result<FieldKey, DecodeError> {
        let start = self.offset;
        let raw = self.read_varint()?;
        let raw = u32::try_from(raw)
            .map_err(|_| DecodeError::invalid_key("key exceeds 32 bits").at_offset(start))?;
        FieldKey::from_raw(raw).map_err(|err| err.at_offset(start))
    }
}

impl Default for WireBuffer {
    fn default() -> Self {
        WireBuffer::new()
    }
}

impl From<Vec<u8>> for WireBuffer {
    fn from(data: Vec<u8>) -> Self {
        WireBuffer::from_vec(data)
    }
}

impl From<&[u8]> for WireBuffer {
    fn from(bytes: &[u8]) -> Self {
        WireBuffer::from_slice(bytes)
    }
}

impl From<Bytes> for WireBuffer {
    fn from(bytes: Bytes) -> Self {
        WireBuffer::from_vec(Vec::from(bytes))
    }
}
