//! Wire format framing for Google's Protocol Buffers, aka
//! [protobuf](https://protobuf.dev).
//!
//! An encoded message is a sequence of records, each a field key (tag and
//! wire type packed into one varint) followed by a payload whose size the
//! wire type determines.

use crate::error::{DecodeError, EncodeError, SchemaError};
use crate::leb128;

/// Minimum value of a protobuf field index.
pub const MIN_FIELD_INDEX: u32 = 1;
/// Maximum value of a protobuf field index.
pub const MAX_FIELD_INDEX: u32 = (1 << 29) - 1;

/// Denotes the type of a field in an encoded protobuf message.
///
/// The wire type indicates how large the proceeding payload is. Group wire
/// types are parseable for completeness but every codec operation over them
/// fails.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum WireType {
    /// Variable length integer.
    ///
    /// Used for: `int32`, `int64`, `uint32`, `uint64`, `sint32`, `sint64`,
    /// `bool`, `enum`.
    Varint = 0,
    /// 64-bit little-endian word.
    ///
    /// Used for: `fixed64`, `sfixed64`, `double`.
    I64 = 1,
    /// Variable length field.
    ///
    /// Used for: `string`, `bytes`, `message`, packed `repeated` fields.
    Len = 2,
    /// Group start (deprecated).
    SGroup = 3,
    /// Group end (deprecated).
    EGroup = 4,
    /// 32-bit little-endian word.
    ///
    /// Used for: `fixed32`, `sfixed32`, `float`.
    I32 = 5,
}

impl WireType {
    /// Try to decode a [`WireType`] from the provided raw value.
    #[inline]
    pub fn try_from_val(value: u8) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::I64),
            2 => Ok(WireType::Len),
            3 => Ok(WireType::SGroup),
            4 => Ok(WireType::EGroup),
            5 => Ok(WireType::I32),
            _ => Err(DecodeError::invalid_wire_type(value)),
        }
    }

    /// Return the raw value for this [`WireType`].
    #[inline]
    #[allow(clippy::as_conversions)]
    pub const fn into_val(self) -> u8 {
        self as u8
    }

    /// Whether repeated values of this wire type may be packed into a single
    /// length-delimited block.
    #[inline]
    pub const fn is_packable(self) -> bool {
        matches!(self, WireType::Varint | WireType::I32 | WireType::I64)
    }

    /// Whether this is one of the deprecated group markers.
    #[inline]
    pub const fn is_group(self) -> bool {
        matches!(self, WireType::SGroup | WireType::EGroup)
    }
}

impl TryFrom<u8> for WireType {
    type Error = DecodeError;

    #[inline]
    fn try_from(value: u8) -> Result<Self, DecodeError> {
        WireType::try_from_val(value)
    }
}

/// A protobuf field key: a field index paired with a wire type.
///
/// The raw layout mirrors the wire format: bits 0-2 hold the wire type,
/// bits 3-31 the field index (1 to 2^29 - 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldKey {
    index: u32,
    wire_type: WireType,
}

impl FieldKey {
    /// Create a key, validating the index range.
    #[inline]
    pub fn new(index: u32, wire_type: WireType) -> Result<Self, SchemaError> {
        if !(MIN_FIELD_INDEX..=MAX_FIELD_INDEX).contains(&index) {
            return Err(SchemaError::FieldIndexOutOfRange { index });
        }
        Ok(FieldKey { index, wire_type })
    }

    /// Reassemble a key from its raw varint value, validating both halves.
    #[inline]
    #[allow(clippy::as_conversions)]
    pub fn from_raw(raw: u32) -> Result<Self, DecodeError> {
        let wire_type = WireType::try_from_val((raw & 0b111) as u8)?;
        let index = raw >> 3;
        if index < MIN_FIELD_INDEX || index > MAX_FIELD_INDEX {
            return Err(DecodeError::invalid_key("tag out of range"));
        }
        Ok(FieldKey { index, wire_type })
    }

    /// The raw varint value of this key.
    #[inline]
    #[allow(clippy::as_conversions)]
    pub const fn raw(self) -> u32 {
        (self.index << 3) | (self.wire_type.into_val() as u32)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub const fn wire_type(self) -> WireType {
        self.wire_type
    }

    /// Decomposes this key into its index and [`WireType`] components.
    #[inline]
    pub const fn into_parts(self) -> (u32, WireType) {
        (self.index, self.wire_type)
    }
}

/// Returns the encoded length of a field key.
///
/// The wire type only occupies the low three bits, so the length depends on
/// the index alone. Called for every field during length pre-computation.
#[inline]
pub fn key_len(index: u32) -> usize {
    leb128::varint_len_u64(u64::from(index) << 3)
}

/// Total payload length of a packed block of plain varint or fixed-width
/// values.
///
/// Length-delimited and group wire types cannot be packed.
pub fn packed_len(wire_type: WireType, values: &[u64]) -> Result<usize, EncodeError> {
    match wire_type {
        WireType::Varint => Ok(values.iter().map(|&v| leb128::varint_len_u64(v)).sum()),
        WireType::I32 => Ok(values.len() * 4),
        WireType::I64 => Ok(values.len() * 8),
        WireType::Len | WireType::SGroup | WireType::EGroup => Err(EncodeError::new(
            crate::error::EncodeErrorKind::UnpackableWireType {
                wire_type: wire_type.into_val(),
            },
        )),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_all_wire_type_values() {
        for i in u8::MIN..=u8::MAX {
            let wire_type = WireType::try_from_val(i);
            match (i, wire_type) {
                (0, Ok(WireType::Varint))
                | (1, Ok(WireType::I64))
                | (2, Ok(WireType::Len))
                | (3, Ok(WireType::SGroup))
                | (4, Ok(WireType::EGroup))
                | (5, Ok(WireType::I32)) => (),
                (6..=u8::MAX, Err(_)) => (),
                other => panic!("unexpected value {other:?}"),
            }
        }
    }

    #[test]
    fn test_key_raw_layout() {
        let key = FieldKey::new(1, WireType::Varint).unwrap();
        assert_eq!(key.raw(), 0x08);

        let key = FieldKey::new(2, WireType::Len).unwrap();
        assert_eq!(key.raw(), 0x12);

        let key = FieldKey::new(3, WireType::I32).unwrap();
        assert_eq!(key.raw(), 0x1D);
    }

    #[test]
    fn test_key_rejects_bad_tags() {
        assert!(FieldKey::new(0, WireType::Varint).is_err());
        assert!(FieldKey::new(MAX_FIELD_INDEX + 1, WireType::Varint).is_err());
        assert!(FieldKey::new(MAX_FIELD_INDEX, WireType::Varint).is_ok());

        assert!(FieldKey::from_raw(0).is_err());
        assert!(FieldKey::from_raw(0b110).is_err());
    }

    #[test]
    fn test_key_len() {
        assert_eq!(key_len(1), 1);
        assert_eq!(key_len(15), 1);
        assert_eq!(key_len(16), 2);
        assert_eq!(key_len(MAX_FIELD_INDEX), 5);
    }

    #[test]
    fn test_packed_len() {
        assert_eq!(packed_len(WireType::Varint, &[1, 2, 300]).unwrap(), 4);
        assert_eq!(packed_len(WireType::I32, &[1, 2, 3]).unwrap(), 12);
        assert_eq!(packed_len(WireType::I64, &[1, 2, 3]).unwrap(), 24);
        assert!(packed_len(WireType::Len, &[1]).is_err());
        assert!(packed_len(WireType::SGroup, &[]).is_err());
    }

    proptest! {
        #[test]
        fn proptest_key_roundtrips(
            index in MIN_FIELD_INDEX..=MAX_FIELD_INDEX,
            wire_type_val in 0..=5u8,
        ) {
            let wire_type = WireType::try_from_val(wire_type_val).unwrap();
            let key = FieldKey::new(index, wire_type).unwrap();
            let rnd = FieldKey::from_raw(key.raw()).unwrap();

            prop_assert_eq!(rnd.index(), index);
            prop_assert_eq!(rnd.wire_type(), wire_type);
        }
    }
}
