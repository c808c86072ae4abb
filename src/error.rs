//! Error types for encode, decode, and schema construction failures.
//!
//! Errors are terminal: they abort the current operation and are never
//! recovered locally. Each carrier attaches the context a caller needs to
//! identify the offending field or offset.

use std::fmt;

/// Reasons an encode operation can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeErrorKind {
    /// A length-delimited payload exceeded the 2^32 - 1 byte limit.
    PayloadTooLong { len: usize },
    /// A write ran past the end of a fixed-capacity buffer.
    BufferOverflow { needed: usize, capacity: usize },
    /// A field index outside `1 ..= 2^29 - 1`.
    TagOutOfRange { tag: u32 },
    /// Group wire types are recognized but never encoded.
    DeprecatedGroupEncoding,
    /// The value's variant does not match the codec's value domain.
    WrongValueKind {
        expected: &'static str,
        found: &'static str,
    },
    /// Packed length is only defined for varint and fixed-width wire types.
    UnpackableWireType { wire_type: u8 },
    /// A variant value whose discriminator is not registered.
    UnknownVariant { name: String },
    /// JSON serialization failed.
    Json { message: String },
}

impl fmt::Display for EncodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeErrorKind::PayloadTooLong { len } => {
                write!(f, "payload of {len} bytes exceeds the wire format limit")
            }
            EncodeErrorKind::BufferOverflow { needed, capacity } => {
                write!(
                    f,
                    "write of {needed} bytes overflows fixed buffer of {capacity} bytes"
                )
            }
            EncodeErrorKind::TagOutOfRange { tag } => {
                write!(f, "field index {tag} is outside the valid range")
            }
            EncodeErrorKind::DeprecatedGroupEncoding => {
                write!(f, "deprecated group encoding not supported")
            }
            EncodeErrorKind::WrongValueKind { expected, found } => {
                write!(f, "expected a {expected} value, found {found}")
            }
            EncodeErrorKind::UnpackableWireType { wire_type } => {
                write!(f, "wire type {wire_type} cannot be packed")
            }
            EncodeErrorKind::UnknownVariant { name } => {
                write!(f, "no variant registered for '{name}'")
            }
            EncodeErrorKind::Json { message } => {
                write!(f, "JSON serialization failed: {message}")
            }
        }
    }
}

/// An error produced while encoding a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeError {
    kind: EncodeErrorKind,
    field: Option<String>,
}

impl EncodeError {
    pub fn new(kind: EncodeErrorKind) -> Self {
        EncodeError { kind, field: None }
    }

    /// Attach the name of the field being encoded, unless one is already set.
    #[must_use]
    pub fn with_field(mut self, name: &str) -> Self {
        if self.field.is_none() {
            self.field = Some(name.to_owned());
        }
        self
    }

    pub fn kind(&self) -> &EncodeErrorKind {
        &self.kind
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub(crate) fn payload_too_long(len: usize) -> Self {
        EncodeError::new(EncodeErrorKind::PayloadTooLong { len })
    }

    pub(crate) fn buffer_overflow(needed: usize, capacity: usize) -> Self {
        EncodeError::new(EncodeErrorKind::BufferOverflow { needed, capacity })
    }

    pub(crate) fn tag_out_of_range(tag: u32) -> Self {
        EncodeError::new(EncodeErrorKind::TagOutOfRange { tag })
    }

    pub(crate) fn wrong_value_kind(expected: &'static str, found: &'static str) -> Self {
        EncodeError::new(EncodeErrorKind::WrongValueKind { expected, found })
    }

    pub(crate) fn unknown_variant(name: &str) -> Self {
        EncodeError::new(EncodeErrorKind::UnknownVariant {
            name: name.to_owned(),
        })
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "failed to encode field '{field}': {}", self.kind),
            None => write!(f, "encode error: {}", self.kind),
        }
    }
}

impl std::error::Error for EncodeError {}

impl From<EncodeErrorKind> for EncodeError {
    fn from(kind: EncodeErrorKind) -> Self {
        EncodeError::new(kind)
    }
}

/// Reasons a decode operation can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// A read ran past the end of the buffer.
    UnexpectedEndOfBuffer,
    /// A wire type value outside `0..=5`.
    InvalidWireType { value: u8 },
    /// A field key with a tag of zero or out of range.
    InvalidKey { reason: &'static str },
    /// A varint longer than ten bytes or overflowing 64 bits.
    InvalidVarint,
    /// Group wire types are recognized but never decoded.
    DeprecatedGroupEncoding,
    /// A string field holding invalid UTF-8.
    InvalidUtf8,
    /// A length prefix exceeding addressable memory.
    LengthOverflow { value: u64 },
    /// The wire carried repeats for a field declared singular.
    RepeatedValueForSingularField,
    /// A seek to a position outside the buffer.
    OffsetOutOfBounds { offset: usize, capacity: usize },
    /// Hex input that does not parse.
    InvalidHex { message: String },
    /// A JSON payload that does not parse.
    Json { message: String },
    /// A variant whose discriminator is not registered.
    UnknownVariant { name: String },
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeErrorKind::UnexpectedEndOfBuffer => {
                write!(f, "unexpected end of buffer")
            }
            DecodeErrorKind::InvalidWireType { value } => {
                write!(f, "invalid 'wire type' value: {value}")
            }
            DecodeErrorKind::InvalidKey { reason } => {
                write!(f, "invalid key: '{reason}'")
            }
            DecodeErrorKind::InvalidVarint => {
                write!(f, "invalid leb128 varint")
            }
            DecodeErrorKind::DeprecatedGroupEncoding => {
                write!(f, "deprecated group encoding not supported")
            }
            DecodeErrorKind::InvalidUtf8 => {
                write!(f, "invalid UTF-8 in string field")
            }
            DecodeErrorKind::LengthOverflow { value } => {
                write!(
                    f,
                    "length prefix {value} exceeds platform addressable memory"
                )
            }
            DecodeErrorKind::RepeatedValueForSingularField => {
                write!(f, "wire carried repeated values for a singular field")
            }
            DecodeErrorKind::OffsetOutOfBounds { offset, capacity } => {
                write!(f, "offset {offset} is outside buffer of {capacity} bytes")
            }
            DecodeErrorKind::InvalidHex { message } => {
                write!(f, "invalid hex input: {message}")
            }
            DecodeErrorKind::Json { message } => {
                write!(f, "invalid JSON payload: {message}")
            }
            DecodeErrorKind::UnknownVariant { name } => {
                write!(f, "no variant registered for '{name}'")
            }
        }
    }
}

/// An error produced while decoding wire bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    kind: DecodeErrorKind,
    field: Option<String>,
    offset: Option<usize>,
}

impl DecodeError {
    pub fn new(kind: DecodeErrorKind) -> Self {
        DecodeError {
            kind,
            field: None,
            offset: None,
        }
    }

    /// Attach the name of the field being decoded, unless one is already set.
    #[must_use]
    pub fn with_field(mut self, name: &str) -> Self {
        if self.field.is_none() {
            self.field = Some(name.to_owned());
        }
        self
    }

    /// Attach the buffer offset the failure occurred at.
    #[must_use]
    pub fn at_offset(mut self, offset: usize) -> Self {
        if self.offset.is_none() {
            self.offset = Some(offset);
        }
        self
    }

    pub fn kind(&self) -> &DecodeErrorKind {
        &self.kind
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    pub(crate) fn unexpected_end_of_buffer() -> Self {
        DecodeError::new(DecodeErrorKind::UnexpectedEndOfBuffer)
    }

    pub(crate) fn deprecated_group_encoding() -> Self {
        DecodeError::new(DecodeErrorKind::DeprecatedGroupEncoding)
    }

    pub(crate) fn invalid_key(reason: &'static str) -> Self {
        DecodeError::new(DecodeErrorKind::InvalidKey { reason })
    }

    pub(crate) fn invalid_wire_type(value: u8) -> Self {
        DecodeError::new(DecodeErrorKind::InvalidWireType { value })
    }

    pub(crate) fn length_overflow(value: u64) -> Self {
        DecodeError::new(DecodeErrorKind::LengthOverflow { value })
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decode error")?;
        if let Some(offset) = self.offset {
            write!(f, " at offset {offset}")?;
        }
        if let Some(field) = &self.field {
            write!(f, " in field '{field}'")?;
        }
        write!(f, ": {}", self.kind)
    }
}

impl std::error::Error for DecodeError {}

impl From<DecodeErrorKind> for DecodeError {
    fn from(kind: DecodeErrorKind) -> Self {
        DecodeError::new(kind)
    }
}

/// Reasons a message schema can fail construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaError {
    /// Two field schemas share the same index.
    DuplicateFieldIndex { index: u32 },
    /// A field index of zero or above `2^29 - 1`.
    FieldIndexOutOfRange { index: u32 },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::DuplicateFieldIndex { index } => {
                write!(f, "duplicate field index {index} in message schema")
            }
            SchemaError::FieldIndexOutOfRange { index } => {
                write!(f, "field index {index} is outside the valid range")
            }
        }
    }
}

impl std::error::Error for SchemaError {}
