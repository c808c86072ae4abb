//! Field schemas and the programmatic schema-construction surface.
//!
//! A [`FieldSchema`] binds a codec to a field index with a repetition mode
//! and a required flag. Factory functions cover every primitive codec;
//! the [`repeated`] and [`repeated::expanded`] modules mirror them for
//! repeated fields.

use std::sync::Arc;

use crate::buffer::WireBuffer;
use crate::codec::{
    BoolCodec, BytesCodec, Codec, DoubleCodec, EnumCodec, Fixed32Codec, Fixed64Codec, FloatCodec,
    Int32Codec, Int64Codec, JsonCodec, JsonEncoding, MessageCodec, Sfixed32Codec, Sfixed64Codec,
    Sint32Codec, Sint64Codec, StringCodec, Transform, Transformed, UInt32Codec, UInt64Codec,
};
use crate::error::{EncodeError, SchemaError};
use crate::leb128;
use crate::value::Value;
use crate::wire::{key_len, WireType};

/// How a field repeats on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Repeated {
    /// A singular field.
    #[default]
    None,
    /// Repeated, packed into a single length-delimited block where the wire
    /// type allows; length-delimited codecs fall back to expanded.
    Packed,
    /// Repeated, one key-framed element per value.
    Expanded,
}

/// The repetition shape a field actually encodes with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncodeMode {
    Single,
    Packed,
    Expanded,
}

/// A codec bound to a field index with repetition and required policy.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    index: u32,
    codec: Arc<dyn Codec>,
    repeated: Repeated,
    required: bool,
}

impl FieldSchema {
    /// Bind `codec` to `index` as a singular, optional field.
    pub fn new(index: u32, codec: Arc<dyn Codec>) -> Self {
        FieldSchema {
            index,
            codec,
            repeated: Repeated::None,
            required: false,
        }
    }

    fn with_mode(index: u32, codec: Arc<dyn Codec>, repeated: Repeated) -> Self {
        FieldSchema {
            index,
            codec,
            repeated,
            required: false,
        }
    }

    /// Mark the field required.
    ///
    /// The wire format carries no required bit; the flag enforces presence
    /// by populating the codec default when the payload omits the field.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Wrap this field's codec in a [`Transform`].
    #[must_use]
    pub fn transform(mut self, transform: Transform) -> Self {
        self.codec = Arc::new(Transformed::new(self.codec, transform));
        self
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    pub fn repeated(&self) -> Repeated {
        self.repeated
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    fn encode_mode(&self) -> EncodeMode {
        match self.repeated {
            Repeated::None => EncodeMode::Single,
            Repeated::Expanded => EncodeMode::Expanded,
            Repeated::Packed => {
                if self.codec.wire_type().is_packable() {
                    EncodeMode::Packed
                } else {
                    EncodeMode::Expanded
                }
            }
        }
    }

    fn expect_items<'a>(&self, value: &'a Value) -> Result<&'a [Value], EncodeError> {
        value
            .as_list()
            .ok_or_else(|| EncodeError::wrong_value_kind("list", value.kind()))
    }

    /// Write the field, key included. Repeated modes expect a list value;
    /// the message engine has already dealt with elision.
    pub(crate) fn encode(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        match self.encode_mode() {
            EncodeMode::Single => {
                buf.write_key(self.index, self.codec.wire_type())?;
                self.codec.encode(value, buf)
            }
            EncodeMode::Packed => {
                let items = self.expect_items(value)?;
                let mut total = 0usize;
                for item in items {
                    total += self.codec.encoded_len(item)?;
                }
                buf.write_key(self.index, WireType::Len)?;
                let framed =
                    u64::try_from(total).map_err(|_| EncodeError::payload_too_long(total))?;
                buf.write_varint(framed)?;
                for item in items {
                    self.codec.encode(item, buf)?;
                }
                Ok(())
            }
            EncodeMode::Expanded => {
                let items = self.expect_items(value)?;
                for item in items {
                    buf.write_key(self.index, self.codec.wire_type())?;
                    self.codec.encode(item, buf)?;
                }
                Ok(())
            }
        }
    }

    /// Exact byte count [`encode`](Self::encode) will produce, key included.
    pub fn encoded_len(&self, value: &Value) -> Result<usize, EncodeError> {
        match self.encode_mode() {
            EncodeMode::Single => Ok(key_len(self.index) + self.codec.encoded_len(value)?),
            EncodeMode::Packed => {
                let items = self.expect_items(value)?;
                let mut total = 0usize;
                for item in items {
                    total += self.codec.encoded_len(item)?;
                }
                let framed =
                    u64::try_from(total).map_err(|_| EncodeError::payload_too_long(total))?;
                Ok(key_len(self.index) + leb128::varint_len_u64(framed) + total)
            }
            EncodeMode::Expanded => {
                let mut total = 0usize;
                for item in self.expect_items(value)? {
                    total += key_len(self.index) + self.codec.encoded_len(item)?;
                }
                Ok(total)
            }
        }
    }
}

/// Build a [`MessageCodec`] from `(name, schema)` pairs in declaration
/// order.
///
/// Fails if two schemas share an index or an index is out of range.
pub fn message<N, I>(fields: I) -> Result<MessageCodec, SchemaError>
where
    N: Into<String>,
    I: IntoIterator<Item = (N, FieldSchema)>,
{
    MessageCodec::from_fields(
        fields
            .into_iter()
            .map(|(name, schema)| (name.into(), schema))
            .collect(),
    )
}

macro_rules! scalar_factories {
    ($($(#[$doc:meta])* $name:ident => $codec:expr;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(index: u32) -> FieldSchema {
                FieldSchema::new(index, Arc::new($codec))
            }
        )*

        /// Repeated-field factories; scalar fields pack by default.
        pub mod repeated {
            use super::*;

            $(
                $(#[$doc])*
                pub fn $name(index: u32) -> FieldSchema {
                    FieldSchema::with_mode(index, Arc::new($codec), Repeated::Packed)
                }
            )*

            /// Submessage fields are length-delimited and always expand.
            pub fn submessage(index: u32, codec: MessageCodec) -> FieldSchema {
                FieldSchema::with_mode(index, Arc::new(codec), Repeated::Packed)
            }

            pub fn json(index: u32, encoding: JsonEncoding) -> FieldSchema {
                FieldSchema::with_mode(index, Arc::new(JsonCodec::new(encoding)), Repeated::Packed)
            }

            /// Repeated fields forced to one key-framed element per value.
            pub mod expanded {
                use super::*;

                $(
                    $(#[$doc])*
                    pub fn $name(index: u32) -> FieldSchema {
                        FieldSchema::with_mode(index, Arc::new($codec), Repeated::Expanded)
                    }
                )*

                pub fn submessage(index: u32, codec: MessageCodec) -> FieldSchema {
                    FieldSchema::with_mode(index, Arc::new(codec), Repeated::Expanded)
                }

                pub fn json(index: u32, encoding: JsonEncoding) -> FieldSchema {
                    FieldSchema::with_mode(
                        index,
                        Arc::new(JsonCodec::new(encoding)),
                        Repeated::Expanded,
                    )
                }
            }
        }
    };
}

scalar_factories! {
    /// A `bool` field.
    boolean => BoolCodec;
    /// An `int32` field.
    int32 => Int32Codec;
    /// An `int64` field.
    int64 => Int64Codec;
    /// A `uint32` field.
    uint32 => UInt32Codec;
    /// A `uint64` field.
    uint64 => UInt64Codec;
    /// A zigzag `sint32` field.
    sint32 => Sint32Codec;
    /// A zigzag `sint64` field.
    sint64 => Sint64Codec;
    /// A `fixed32` field.
    fixed32 => Fixed32Codec;
    /// A `fixed64` field.
    fixed64 => Fixed64Codec;
    /// An `sfixed32` field.
    sfixed32 => Sfixed32Codec;
    /// An `sfixed64` field.
    sfixed64 => Sfixed64Codec;
    /// A `float` field.
    float => FloatCodec;
    /// A `double` field.
    double => DoubleCodec;
    /// An open `enum` field.
    enumeration => EnumCodec;
    /// A UTF-8 `string` field.
    string => StringCodec;
    /// A raw `bytes` field.
    bytes => BytesCodec;
}

/// A nested message field.
pub fn submessage(index: u32, codec: MessageCodec) -> FieldSchema {
    FieldSchema::new(index, Arc::new(codec))
}

/// A JSON payload carried as a string field.
pub fn json(index: u32, encoding: JsonEncoding) -> FieldSchema {
    FieldSchema::new(index, Arc::new(JsonCodec::new(encoding)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_defaults() {
        let field = int32(3);
        assert_eq!(field.index(), 3);
        assert_eq!(field.repeated(), Repeated::None);
        assert!(!field.is_required());

        let field = repeated::int32(3);
        assert_eq!(field.repeated(), Repeated::Packed);

        let field = repeated::expanded::int32(3);
        assert_eq!(field.repeated(), Repeated::Expanded);
    }

    #[test]
    fn test_required_is_fluent() {
        assert!(bytes(2).required().is_required());
    }

    #[test]
    fn test_len_codecs_never_pack() {
        // `repeated::string` carries the packed-by-default mode but resolves
        // to expanded encoding.
        let field = repeated::string(1);
        assert_eq!(field.repeated(), Repeated::Packed);

        let value = Value::list(["a", "b"]);
        let mut buf = WireBuffer::new();
        field.encode(&value, &mut buf).unwrap();
        // Two key-framed elements, not one packed block.
        assert_eq!(buf.written_bytes(), &[0x0A, 1, b'a', 0x0A, 1, b'b']);
    }

    #[test]
    fn test_packed_layout() {
        let field = repeated::int32(1);
        let value = Value::list([1, 2, 3]);

        let mut buf = WireBuffer::new();
        field.encode(&value, &mut buf).unwrap();
        assert_eq!(buf.written_bytes(), &[0x0A, 0x03, 0x01, 0x02, 0x03]);
        assert_eq!(field.encoded_len(&value).unwrap(), 5);
    }

    #[test]
    fn test_expanded_layout() {
        let field = repeated::expanded::int32(1);
        let value = Value::list([1, 2, 3]);

        let mut buf = WireBuffer::new();
        field.encode(&value, &mut buf).unwrap();
        assert_eq!(buf.written_bytes(), &[0x08, 1, 0x08, 2, 0x08, 3]);
        assert_eq!(field.encoded_len(&value).unwrap(), 6);
    }

    #[test]
    fn test_single_layout() {
        let field = int32(1);
        let mut buf = WireBuffer::new();
        field.encode(&Value::Int32(42), &mut buf).unwrap();
        assert_eq!(buf.written_bytes(), &[0x08, 0x2A]);
        assert_eq!(field.encoded_len(&Value::Int32(42)).unwrap(), 2);
    }

    #[test]
    fn test_wide_index_key_length() {
        // Indexes above 15 need a multi-byte key; the predictor must agree.
        let field = int32(300);
        let value = Value::Int32(1);

        let mut buf = WireBuffer::new();
        field.encode(&value, &mut buf).unwrap();
        assert_eq!(buf.written_len(), field.encoded_len(&value).unwrap());
        assert_eq!(field.encoded_len(&value).unwrap(), 3);
    }

    #[test]
    fn test_field_transform_rebinds_codec() {
        let field = int32(1).transform(Transform::infallible(
            |v| match v {
                Value::Int32(n) => Value::Int32(n + 1),
                other => other,
            },
            |v| match v {
                Value::Int32(n) => Value::Int32(n - 1),
                other => other,
            },
            0i32,
        ));

        let mut buf = WireBuffer::new();
        field.encode(&Value::Int32(41), &mut buf).unwrap();
        assert_eq!(buf.written_bytes(), &[0x08, 0x2A]);
    }
}
