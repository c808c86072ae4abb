//! Discriminated-union support: a registry of message codecs selected by a
//! type discriminator.
//!
//! The wire shape is a fixed outer message
//! `{ typename: string(1), typeid: int32(2), value: bytes(3) }` whose
//! `value` field nests the selected codec's encoding. A message-level
//! transform maps that envelope to and from
//! `{ type: <name>, value: <inner message> }`.

use std::sync::Arc;

use crate::error::{DecodeError, DecodeErrorKind, EncodeError, SchemaError};
use crate::schema::{self, message};
use crate::value::{MessageValue, Value};

use super::{MessageCodec, Transform};

#[derive(Debug, Clone)]
struct VariantEntry {
    name: String,
    id: i32,
    codec: MessageCodec,
}

/// A set of named, numbered message codecs forming a discriminated union.
#[derive(Debug, Clone, Default)]
pub struct VariantRegistry {
    entries: Vec<VariantEntry>,
}

impl VariantRegistry {
    pub fn new() -> Self {
        VariantRegistry::default()
    }

    /// Register a variant under a type name and numeric id.
    #[must_use]
    pub fn register(mut self, name: impl Into<String>, id: i32, codec: MessageCodec) -> Self {
        self.entries.push(VariantEntry {
            name: name.into(),
            id,
            codec,
        });
        self
    }

    /// Build the envelope codec for this registry.
    ///
    /// Encoding fails if a value's `type` field does not resolve to a
    /// registered variant; decoding resolves by `typeid` first, falling
    /// back to `typename`.
    pub fn codec(&self) -> Result<MessageCodec, SchemaError> {
        let envelope = message([
            ("typename", schema::string(1)),
            ("typeid", schema::int32(2)),
            ("value", schema::bytes(3)),
        ])?;

        let encode_entries: Arc<Vec<VariantEntry>> = Arc::new(self.entries.clone());
        let decode_entries = Arc::clone(&encode_entries);

        Ok(envelope.transform(Transform::new(
            move |value| {
                let msg = value
                    .as_message()
                    .ok_or_else(|| EncodeError::wrong_value_kind("message", value.kind()))?;
                let name = msg.get("type").and_then(Value::as_str).unwrap_or("");
                let entry = encode_entries
                    .iter()
                    .find(|entry| entry.name == name)
                    .ok_or_else(|| EncodeError::unknown_variant(name))?;
                let inner_value = msg
                    .get("value")
                    .cloned()
                    .unwrap_or_else(|| Value::Message(MessageValue::new()));
                let inner = entry.codec.encode(&inner_value)?;
                Ok(Value::Message(
                    MessageValue::new()
                        .with("typename", entry.name.clone())
                        .with("typeid", entry.id)
                        .with("value", inner.into_bytes()),
                ))
            },
            move |value| {
                let msg = match value.as_message() {
                    Some(msg) => msg,
                    None => return Ok(value),
                };
                let id = msg.get("typeid").and_then(Value::as_i32).unwrap_or(0);
                let name = msg.get("typename").and_then(Value::as_str).unwrap_or("");
                let entry = decode_entries
                    .iter()
                    .find(|entry| entry.id == id)
                    .or_else(|| decode_entries.iter().find(|entry| entry.name == name))
                    .ok_or_else(|| {
                        DecodeError::new(DecodeErrorKind::UnknownVariant {
                            name: if name.is_empty() {
                                format!("typeid {id}")
                            } else {
                                name.to_owned()
                            },
                        })
                    })?;
                let payload = msg
                    .get("value")
                    .and_then(Value::as_bytes)
                    .cloned()
                    .unwrap_or_default();
                let inner = entry.codec.decode(payload)?;
                Ok(Value::Message(
                    MessageValue::new()
                        .with("type", entry.name.clone())
                        .with("value", inner),
                ))
            },
            Value::Message(MessageValue::new()),
        )))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::EncodeErrorKind;
    use crate::schema::{self, message};

    use super::*;

    fn registry() -> VariantRegistry {
        let circle = message([("radius", schema::int32(1))]).unwrap();
        let rect = message([("width", schema::int32(1)), ("height", schema::int32(2))]).unwrap();
        VariantRegistry::new()
            .register("circle", 1, circle)
            .register("rect", 2, rect)
    }

    #[test]
    fn test_variant_roundtrip() {
        let codec = registry().codec().unwrap();

        let value: Value = MessageValue::new()
            .with("type", "rect")
            .with(
                "value",
                MessageValue::new().with("width", 3).with("height", 4),
            )
            .into();

        let buf = codec.encode(&value).unwrap();
        let decoded = codec.decode(buf.written_bytes()).unwrap();

        let msg = decoded.as_message().unwrap();
        assert_eq!(msg.get("type"), Some(&Value::String("rect".to_owned())));
        let inner = msg.get("value").unwrap().as_message().unwrap();
        assert_eq!(inner.get("width"), Some(&Value::Int32(3)));
        assert_eq!(inner.get("height"), Some(&Value::Int32(4)));
    }

    #[test]
    fn test_unregistered_variant_fails_encode() {
        let codec = registry().codec().unwrap();
        let value: Value = MessageValue::new().with("type", "triangle").into();

        let err = codec.encode(&value).unwrap_err();
        assert!(matches!(
            err.kind(),
            EncodeErrorKind::UnknownVariant { name } if name == "triangle"
        ));
    }

    #[test]
    fn test_unregistered_variant_fails_decode() {
        let envelope = message([
            ("typename", schema::string(1)),
            ("typeid", schema::int32(2)),
            ("value", schema::bytes(3)),
        ])
        .unwrap();
        let wire = envelope
            .encode(
                &MessageValue::new()
                    .with("typename", "ghost")
                    .with("typeid", 99)
                    .into(),
            )
            .unwrap();

        let codec = registry().codec().unwrap();
        let err = codec.decode(wire.written_bytes()).unwrap_err();
        assert!(matches!(
            err.kind(),
            DecodeErrorKind::UnknownVariant { .. }
        ));
    }

    #[test]
    fn test_decode_resolves_by_name_when_id_unset() {
        let envelope = message([
            ("typename", schema::string(1)),
            ("typeid", schema::int32(2)),
            ("value", schema::bytes(3)),
        ])
        .unwrap();
        let inner = message([("radius", schema::int32(1))]).unwrap();
        let payload = inner
            .encode(&MessageValue::new().with("radius", 5).into())
            .unwrap();
        let wire = envelope
            .encode(
                &MessageValue::new()
                    .with("typename", "circle")
                    .with("typeid", 0)
                    .with("value", payload.into_bytes())
                    .into(),
            )
            .unwrap();

        let codec = registry().codec().unwrap();
        let decoded = codec.decode(wire.written_bytes()).unwrap();
        let msg = decoded.as_message().unwrap();
        assert_eq!(msg.get("type"), Some(&Value::String("circle".to_owned())));
    }
}
