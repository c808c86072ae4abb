//! The message engine: drives field iteration, repetition modes, default
//! elision, unknown-field preservation, and message-level transforms.

use std::borrow::Cow;
use std::collections::HashMap;

use smallvec::SmallVec;

use crate::buffer::WireBuffer;
use crate::error::{DecodeError, DecodeErrorKind, EncodeError, SchemaError};
use crate::schema::{FieldSchema, Repeated};
use crate::value::{MessageValue, UnknownField, Value};
use crate::wire::{FieldKey, WireType, MAX_FIELD_INDEX, MIN_FIELD_INDEX};

use super::{Codec, Transform};

/// Most fields carry zero or one value; packed blocks spill past inline
/// capacity.
type ValueAcc = SmallVec<[Value; 2]>;

#[derive(Debug, Clone)]
struct FieldSlot {
    name: String,
    schema: FieldSchema,
}

/// A complete message codec: an insertion-ordered field map plus a reverse
/// index used during decode.
///
/// `MessageCodec` implements [`Codec`] itself, so a message nests inside
/// another as an ordinary length-delimited field. Codecs are immutable
/// after construction and cheap to clone.
#[derive(Debug, Clone)]
pub struct MessageCodec {
    fields: Vec<FieldSlot>,
    by_index: HashMap<u32, usize>,
    transforms: Vec<Transform>,
}

impl MessageCodec {
    pub(crate) fn from_fields(fields: Vec<(String, FieldSchema)>) -> Result<Self, SchemaError> {
        let mut slots = Vec::with_capacity(fields.len());
        let mut by_index = HashMap::with_capacity(fields.len());
        for (name, schema) in fields {
            let index = schema.index();
            if !(MIN_FIELD_INDEX..=MAX_FIELD_INDEX).contains(&index) {
                return Err(SchemaError::FieldIndexOutOfRange { index });
            }
            if by_index.insert(index, slots.len()).is_some() {
                return Err(SchemaError::DuplicateFieldIndex { index });
            }
            slots.push(FieldSlot { name, schema });
        }
        Ok(MessageCodec {
            fields: slots,
            by_index,
            transforms: Vec::new(),
        })
    }

    /// Wrap the whole codec in a message-level [`Transform`].
    ///
    /// With transforms `t1` then `t2` registered, decode applies
    /// `t2 ∘ t1` after the raw decode and encode applies `t1 ∘ t2` before
    /// the raw encode. Unknown fields are detached before the user mapping
    /// runs and re-attached afterwards.
    #[must_use]
    pub fn transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSchema)> {
        self.fields
            .iter()
            .map(|slot| (slot.name.as_str(), &slot.schema))
    }

    /// Look up a field schema by name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields
            .iter()
            .find(|slot| slot.name == name)
            .map(|slot| &slot.schema)
    }

    /// A message value with every field set to its codec's default.
    pub fn default_struct(&self) -> MessageValue {
        let mut value = MessageValue::new();
        for slot in &self.fields {
            let field_default = match slot.schema.repeated() {
                Repeated::None => slot.schema.codec().default_value(),
                _ => Value::List(Vec::new()),
            };
            value.set(slot.name.clone(), field_default);
        }
        value
    }

    // ------------------------------------------------------------------
    // Encode
    // ------------------------------------------------------------------

    /// Encode `value` into a fresh growable buffer.
    pub fn encode(&self, value: &Value) -> Result<WireBuffer, EncodeError> {
        let mut buf = WireBuffer::new();
        self.encode_into(value, &mut buf)?;
        Ok(buf)
    }

    /// Encode `value` into `buf` with no outer framing.
    pub fn encode_into(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        let value = self.apply_encode_transforms(value)?;
        let msg = expect_message(&value)?;
        self.encode_fields(msg, buf)
    }

    /// Exact length of the message body `encode` will produce, with no
    /// outer framing.
    pub fn encoded_message_len(&self, value: &Value) -> Result<usize, EncodeError> {
        let value = self.apply_encode_transforms(value)?;
        let msg = expect_message(&value)?;
        self.message_body_len(msg)
    }

    fn apply_encode_transforms<'a>(&self, value: &'a Value) -> Result<Cow<'a, Value>, EncodeError> {
        if self.transforms.is_empty() {
            return Ok(Cow::Borrowed(value));
        }
        // Detach the unknown side channel so user mappings cannot drop it.
        let mut value = value.clone();
        let unknown = match &mut value {
            Value::Message(msg) => msg.take_unknown(),
            _ => Vec::new(),
        };
        for transform in self.transforms.iter().rev() {
            value = transform.apply_encode(value)?;
        }
        if let Value::Message(msg) = &mut value {
            msg.set_unknown(unknown);
        }
        Ok(Cow::Owned(value))
    }

    fn encode_fields(&self, msg: &MessageValue, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        for slot in &self.fields {
            let Some(value) = msg.get(&slot.name) else {
                continue;
            };
            if self.elides(slot, value) {
                continue;
            }
            slot.schema
                .encode(value, buf)
                .map_err(|err| err.with_field(&slot.name))?;
        }
        for unknown in msg.unknown_fields() {
            unknown.encode(buf)?;
        }
        Ok(())
    }

    fn message_body_len(&self, msg: &MessageValue) -> Result<usize, EncodeError> {
        let mut total = 0usize;
        for slot in &self.fields {
            let Some(value) = msg.get(&slot.name) else {
                continue;
            };
            if self.elides(slot, value) {
                continue;
            }
            total += slot
                .schema
                .encoded_len(value)
                .map_err(|err| err.with_field(&slot.name))?;
        }
        for unknown in msg.unknown_fields() {
            total += unknown.encoded_len();
        }
        Ok(total)
    }

    /// Whether a present field is dropped from output entirely.
    fn elides(&self, slot: &FieldSlot, value: &Value) -> bool {
        match slot.schema.repeated() {
            Repeated::None => slot.schema.codec().is_default(value),
            _ => value.as_list().is_some_and(|items| items.is_empty()),
        }
    }

    // ------------------------------------------------------------------
    // Decode
    // ------------------------------------------------------------------

    /// Decode a complete message from `input`, consuming the whole written
    /// payload from the start.
    pub fn decode(&self, input: impl Into<WireBuffer>) -> Result<Value, DecodeError> {
        let mut buf = input.into();
        buf.seek(0)?;
        self.decode_from(&mut buf)
    }

    /// Decode a complete message from the buffer's cursor to the end of its
    /// written payload.
    pub fn decode_from(&self, buf: &mut WireBuffer) -> Result<Value, DecodeError> {
        let msg = self.decode_fields(buf)?;
        self.apply_decode_transforms(msg)
    }

    fn apply_decode_transforms(&self, mut msg: MessageValue) -> Result<Value, DecodeError> {
        if self.transforms.is_empty() {
            return Ok(Value::Message(msg));
        }
        let unknown = msg.take_unknown();
        let mut value = Value::Message(msg);
        for transform in &self.transforms {
            value = transform.apply_decode(value)?;
        }
        if let Value::Message(msg) = &mut value {
            msg.set_unknown(unknown);
        }
        Ok(value)
    }

    fn decode_fields(&self, buf: &mut WireBuffer) -> Result<MessageValue, DecodeError> {
        let mut slots: Vec<ValueAcc> = vec![ValueAcc::new(); self.fields.len()];
        let mut unknown = Vec::new();

        while buf.has_unread() {
            let key = buf.read_key()?;
            if key.wire_type().is_group() {
                return Err(DecodeError::deprecated_group_encoding().at_offset(buf.tell()));
            }
            let Some(&slot_idx) = self.by_index.get(&key.index()) else {
                unknown.push(UnknownField::read(key, buf)?);
                continue;
            };
            let slot = &self.fields[slot_idx];
            self.decode_one(slot, key, buf, &mut slots[slot_idx])
                .map_err(|err| err.with_field(&slot.name))?;
        }

        self.finish_fields(slots, unknown)
    }

    /// Decode a single wire record for a known field.
    ///
    /// A length-delimited record whose schema codec is not length-delimited
    /// is a packed block: the codec runs repeatedly over a sub-buffer until
    /// it is empty.
    fn decode_one(
        &self,
        slot: &FieldSlot,
        key: FieldKey,
        buf: &mut WireBuffer,
        acc: &mut ValueAcc,
    ) -> Result<(), DecodeError> {
        let codec = slot.schema.codec();
        if key.wire_type() == WireType::Len && codec.wire_type() != WireType::Len {
            let len = buf.read_len()?;
            let mut sub = buf.slice(len)?;
            while sub.has_unread() {
                acc.push(codec.decode(&mut sub)?);
            }
        } else {
            acc.push(codec.decode(buf)?);
        }
        Ok(())
    }

    /// Post-pass over the schema in declaration order: fill defaults for
    /// absent fields and normalize repetition shapes.
    fn finish_fields(
        &self,
        slots: Vec<ValueAcc>,
        unknown: Vec<UnknownField>,
    ) -> Result<MessageValue, DecodeError> {
        let mut out = MessageValue::new();
        for (slot, mut acc) in self.fields.iter().zip(slots) {
            let repeated = slot.schema.repeated();
            let value = if acc.len() > 1 {
                if repeated == Repeated::None {
                    return Err(
                        DecodeError::new(DecodeErrorKind::RepeatedValueForSingularField)
                            .with_field(&slot.name),
                    );
                }
                Value::List(acc.into_vec())
            } else if let Some(single) = acc.pop() {
                match repeated {
                    Repeated::None => single,
                    _ => Value::List(vec![single]),
                }
            } else {
                // Absent fields, required ones included, decode to the
                // codec default.
                match repeated {
                    Repeated::None => slot.schema.codec().default_value(),
                    _ => Value::List(Vec::new()),
                }
            };
            out.set(slot.name.clone(), value);
        }
        out.set_unknown(unknown);
        Ok(out)
    }
}

impl Codec for MessageCodec {
    fn wire_type(&self) -> WireType {
        WireType::Len
    }

    fn default_value(&self) -> Value {
        match self.transforms.last() {
            Some(transform) => transform.default_value().clone(),
            None => Value::Message(self.default_struct()),
        }
    }

    fn is_default(&self, value: &Value) -> bool {
        if let Some(transform) = self.transforms.last() {
            return value == transform.default_value();
        }
        let Some(msg) = value.as_message() else {
            return false;
        };
        if !msg.unknown_fields().is_empty() {
            return false;
        }
        msg.fields().all(|(name, field_value)| {
            self.fields
                .iter()
                .find(|slot| slot.name == name)
                .is_some_and(|slot| self.elides(slot, field_value))
        })
    }

    fn encode(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        let value = self.apply_encode_transforms(value)?;
        let msg = expect_message(&value)?;
        let body_len = self.message_body_len(msg)?;
        let framed = u64::try_from(body_len).map_err(|_| EncodeError::payload_too_long(body_len))?;
        buf.write_varint(framed)?;
        self.encode_fields(msg, buf)
    }

    fn decode(&self, buf: &mut WireBuffer) -> Result<Value, DecodeError> {
        let len = buf.read_len()?;
        let mut sub = buf.slice(len)?;
        let msg = self.decode_fields(&mut sub)?;
        self.apply_decode_transforms(msg)
    }

    fn encoded_len(&self, value: &Value) -> Result<usize, EncodeError> {
        let value = self.apply_encode_transforms(value)?;
        let msg = expect_message(&value)?;
        let body_len = self.message_body_len(msg)?;
        let framed = u64::try_from(body_len).map_err(|_| EncodeError::payload_too_long(body_len))?;
        Ok(crate::leb128::varint_len_u64(framed) + body_len)
    }
}

fn expect_message(value: &Value) -> Result<&MessageValue, EncodeError> {
    value
        .as_message()
        .ok_or_else(|| EncodeError::wrong_value_kind("message", value.kind()))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use crate::schema::{self, message, repeated};
    use crate::value::UnknownValue;

    use super::*;

    #[test]
    fn test_duplicate_index_fails_construction() {
        let err = message([("a", schema::int32(1)), ("b", schema::int32(1))]).unwrap_err();
        assert_eq!(err, SchemaError::DuplicateFieldIndex { index: 1 });
    }

    #[test]
    fn test_out_of_range_index_fails_construction() {
        let err = message([("a", schema::int32(0))]).unwrap_err();
        assert_eq!(err, SchemaError::FieldIndexOutOfRange { index: 0 });
    }

    #[test]
    fn test_all_defaults_encode_to_nothing() {
        let codec = message([
            ("flag", schema::boolean(1)),
            ("count", schema::int32(2)),
            ("name", schema::string(3)),
            ("values", repeated::int32(4)),
        ])
        .unwrap();

        let value = Value::Message(codec.default_struct());
        let buf = codec.encode(&value).unwrap();
        assert_eq!(buf.written_len(), 0);
        assert_eq!(codec.encoded_message_len(&value).unwrap(), 0);
    }

    #[test]
    fn test_missing_fields_also_elide() {
        let codec = message([("count", schema::int32(1))]).unwrap();
        let buf = codec.encode(&MessageValue::new().into()).unwrap();
        assert_eq!(buf.written_len(), 0);
    }

    #[test]
    fn test_decode_fills_defaults() {
        let codec = message([
            ("flag", schema::boolean(1)),
            ("name", schema::string(2)),
            ("values", repeated::int32(3)),
            ("blob", schema::bytes(4).required()),
        ])
        .unwrap();

        let decoded = codec.decode(&[][..]).unwrap();
        let msg = decoded.as_message().unwrap();
        assert_eq!(msg.get("flag"), Some(&Value::Bool(false)));
        assert_eq!(msg.get("name"), Some(&Value::String(String::new())));
        assert_eq!(msg.get("values"), Some(&Value::List(Vec::new())));
        // Required enforces presence by populating the default.
        assert_eq!(msg.get("blob"), Some(&Value::Bytes(Bytes::new())));
    }

    #[test]
    fn test_singular_field_rejects_wire_repeats() {
        let codec = message([("count", schema::int32(1))]).unwrap();

        let mut buf = WireBuffer::new();
        buf.write_key(1, WireType::Varint).unwrap();
        buf.write_varint(4).unwrap();
        buf.write_key(1, WireType::Varint).unwrap();
        buf.write_varint(5).unwrap();

        let err = codec.decode(buf.written_bytes()).unwrap_err();
        assert!(matches!(
            err.kind(),
            DecodeErrorKind::RepeatedValueForSingularField
        ));
        assert_eq!(err.field(), Some("count"));
    }

    #[test]
    fn test_scalar_promotes_to_list_for_repeated_field() {
        let codec = message([("values", repeated::int32(1))]).unwrap();

        // One expanded element on the wire.
        let mut buf = WireBuffer::new();
        buf.write_key(1, WireType::Varint).unwrap();
        buf.write_varint(7).unwrap();

        let decoded = codec.decode(buf.written_bytes()).unwrap();
        assert_eq!(
            decoded.as_message().unwrap().get("values"),
            Some(&Value::list([7]))
        );
    }

    #[test]
    fn test_packed_and_expanded_decode_identically() {
        let packed = message([("values", repeated::int32(1))]).unwrap();
        let expanded = message([("values", repeated::expanded::int32(1))]).unwrap();
        let value: Value = MessageValue::new().with("values", Value::list([1, 200, 3])).into();

        let packed_bytes = packed.encode(&value).unwrap();
        let expanded_bytes = expanded.encode(&value).unwrap();
        assert_ne!(packed_bytes.written_bytes(), expanded_bytes.written_bytes());

        // Either schema decodes either wire form to the same value.
        for bytes in [packed_bytes.written_bytes(), expanded_bytes.written_bytes()] {
            for codec in [&packed, &expanded] {
                let decoded = codec.decode(bytes).unwrap();
                assert_eq!(
                    decoded.as_message().unwrap().get("values"),
                    Some(&Value::list([1, 200, 3]))
                );
            }
        }
    }

    #[test]
    fn test_unknown_fields_roundtrip() {
        let writer = message([
            ("id", schema::int32(1)),
            ("name", schema::string(2)),
            ("score", schema::fixed32(3)),
        ])
        .unwrap();
        let reader = message([("id", schema::int32(1))]).unwrap();

        let value: Value = MessageValue::new()
            .with("id", 7)
            .with("name", "ada")
            .with("score", 99u32)
            .into();
        let wire = writer.encode(&value).unwrap();

        let decoded = reader.decode(wire.written_bytes()).unwrap();
        let msg = decoded.as_message().unwrap();
        assert_eq!(msg.get("id"), Some(&Value::Int32(7)));
        assert_eq!(msg.unknown_fields().len(), 2);
        assert_eq!(msg.unknown_fields()[0].index, 2);
        assert!(matches!(
            msg.unknown_fields()[1].value,
            UnknownValue::Fixed32(99)
        ));

        // Re-encoding with the narrow schema reproduces the original bytes.
        let reencoded = reader.encode(&decoded).unwrap();
        assert_eq!(reencoded.written_bytes(), wire.written_bytes());
    }

    #[test]
    fn test_group_wire_types_fail_decode() {
        let codec = message([("id", schema::int32(1))]).unwrap();
        // Key for field 5 with SGROUP wire type.
        let bytes = [(5 << 3) | 3u8];
        let err = codec.decode(&bytes[..]).unwrap_err();
        assert!(matches!(
            err.kind(),
            DecodeErrorKind::DeprecatedGroupEncoding
        ));
    }

    #[test]
    fn test_truncated_input_fails() {
        let codec = message([("name", schema::string(1))]).unwrap();
        // Claims 10 bytes of payload, supplies 2.
        let bytes = [0x0A, 10, b'h', b'i'];
        let err = codec.decode(&bytes[..]).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::UnexpectedEndOfBuffer));
    }

    #[test]
    fn test_nested_messages() {
        let inner = message([("value", schema::int32(1))]).unwrap();
        let outer = message([
            ("name", schema::string(1)),
            ("sub1", schema::submessage(2, inner.clone())),
            ("sub2", schema::submessage(3, inner)),
        ])
        .unwrap();

        let value: Value = MessageValue::new()
            .with("name", "hello")
            .with("sub1", MessageValue::new().with("value", 42))
            .with("sub2", MessageValue::new().with("value", 43))
            .into();

        let buf = outer.encode(&value).unwrap();
        assert_eq!(buf.written_len(), 15);
        assert_eq!(outer.encoded_message_len(&value).unwrap(), 15);

        let decoded = outer.decode(buf.written_bytes()).unwrap();
        let msg = decoded.as_message().unwrap();
        assert_eq!(msg.get("name"), Some(&Value::String("hello".to_owned())));
        let sub1 = msg.get("sub1").unwrap().as_message().unwrap();
        assert_eq!(sub1.get("value"), Some(&Value::Int32(42)));
        let sub2 = msg.get("sub2").unwrap().as_message().unwrap();
        assert_eq!(sub2.get("value"), Some(&Value::Int32(43)));
    }

    #[test]
    fn test_default_submessage_elides() {
        let inner = message([("value", schema::int32(1))]).unwrap();
        let outer = message([("sub", schema::submessage(1, inner.clone()))]).unwrap();

        let value: Value = MessageValue::new()
            .with("sub", MessageValue::new().with("value", 0))
            .into();
        let buf = outer.encode(&value).unwrap();
        assert_eq!(buf.written_len(), 0);

        // A non-default child forces the field out.
        let value: Value = MessageValue::new()
            .with("sub", MessageValue::new().with("value", 1))
            .into();
        let buf = outer.encode(&value).unwrap();
        assert_eq!(buf.written_bytes(), &[0x0A, 0x02, 0x08, 0x01]);
    }

    #[test]
    fn test_message_transform_roundtrip() {
        let codec = message([("id", schema::int32(1))])
            .unwrap()
            .transform(Transform::infallible(
                |value| match value {
                    Value::Message(msg) => {
                        let id = msg.get("external_id").and_then(Value::as_i32).unwrap_or(0);
                        Value::Message(MessageValue::new().with("id", id - 1000))
                    }
                    other => other,
                },
                |value| match value {
                    Value::Message(msg) => {
                        let id = msg.get("id").and_then(Value::as_i32).unwrap_or(0);
                        Value::Message(MessageValue::new().with("external_id", id + 1000))
                    }
                    other => other,
                },
                MessageValue::new().with("external_id", 1000),
            ));

        let value: Value = MessageValue::new().with("external_id", 1042).into();
        let buf = codec.encode(&value).unwrap();
        assert_eq!(buf.written_bytes(), &[0x08, 0x2A]);

        let decoded = codec.decode(buf.written_bytes()).unwrap();
        assert_eq!(
            decoded.as_message().unwrap().get("external_id"),
            Some(&Value::Int32(1042))
        );
    }

    #[test]
    fn test_message_transform_preserves_unknowns() {
        let writer = message([("id", schema::int32(1)), ("extra", schema::int32(2))]).unwrap();
        let reader = message([("id", schema::int32(1))])
            .unwrap()
            .transform(Transform::infallible(
                |value| value,
                |value| match value {
                    Value::Message(msg) => {
                        // A mapping that rebuilds the message from scratch.
                        let id = msg.get("id").and_then(Value::as_i32).unwrap_or(0);
                        Value::Message(MessageValue::new().with("id", id))
                    }
                    other => other,
                },
                MessageValue::new(),
            ));

        let value: Value = MessageValue::new().with("id", 1).with("extra", 2).into();
        let wire = writer.encode(&value).unwrap();

        let decoded = reader.decode(wire.written_bytes()).unwrap();
        let msg = decoded.as_message().unwrap();
        assert_eq!(msg.unknown_fields().len(), 1);

        let reencoded = reader.encode(&decoded).unwrap();
        assert_eq!(reencoded.written_bytes(), wire.written_bytes());
    }

    #[test]
    fn test_decode_accepts_unshrunk_encode_output() {
        let codec = message([("id", schema::int32(1))]).unwrap();
        let value: Value = MessageValue::new().with("id", 5).into();

        let buf = codec.encode(&value).unwrap();
        // The growable buffer holds spare zeroed capacity past the payload
        // and its cursor sits at the end; decode must see neither.
        assert!(buf.capacity() > buf.written_len());

        let decoded = codec.decode(buf).unwrap();
        assert_eq!(
            decoded.as_message().unwrap().get("id"),
            Some(&Value::Int32(5))
        );
    }

    #[test]
    fn test_length_predictor_matches_wide_indexes() {
        let codec = message([
            ("near", schema::int32(1)),
            ("far", schema::int32(1000)),
            ("farther", repeated::int32(20_000)),
        ])
        .unwrap();

        let value: Value = MessageValue::new()
            .with("near", 1)
            .with("far", 2)
            .with("farther", Value::list([3, 4]))
            .into();

        let buf = codec.encode(&value).unwrap();
        assert_eq!(
            buf.written_len(),
            codec.encoded_message_len(&value).unwrap()
        );
    }
}
