//! Dynamic value representation for decoded and to-be-encoded messages.
//!
//! A decoded message is a [`MessageValue`]: an insertion-ordered mapping
//! from field name to [`Value`], with a trailing list of unknown fields
//! that round-trips verbatim through decode and re-encode.

use bytes::Bytes;

use crate::buffer::WireBuffer;
use crate::error::{DecodeError, EncodeError};
use crate::leb128;
use crate::wire::{key_len, FieldKey, WireType};

/// A single dynamically-typed protobuf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Bytes),
    Json(serde_json::Value),
    Message(MessageValue),
    List(Vec<Value>),
}

impl Value {
    /// Short name of this value's variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::UInt32(_) => "uint32",
            Value::UInt64(_) => "uint64",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
            Value::Message(_) => "message",
            Value::List(_) => "list",
        }
    }

    /// Build a list value from anything convertible item-wise.
    pub fn list<T, I>(items: I) -> Value
    where
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::UInt32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&MessageValue> {
        match self {
            Value::Message(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Bytes(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<MessageValue> for Value {
    fn from(v: MessageValue) -> Self {
        Value::Message(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

/// An insertion-ordered mapping from field name to value.
///
/// The unknown-field list is a side channel: it is not part of the declared
/// shape and is carried so a re-encode reproduces fields the schema did not
/// declare.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageValue {
    fields: Vec<(String, Value)>,
    unknown: Vec<UnknownField>,
}

impl MessageValue {
    pub fn new() -> Self {
        MessageValue::default()
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a field, replacing an existing entry in place or appending.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Declared fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.unknown.is_empty()
    }

    pub fn unknown_fields(&self) -> &[UnknownField] {
        &self.unknown
    }

    pub(crate) fn set_unknown(&mut self, unknown: Vec<UnknownField>) {
        self.unknown = unknown;
    }

    pub(crate) fn take_unknown(&mut self) -> Vec<UnknownField> {
        std::mem::take(&mut self.unknown)
    }
}

/// A field present on the wire whose index the schema does not declare.
///
/// Preserved in wire order and re-emitted verbatim after declared fields.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownField {
    pub index: u32,
    pub wire_type: WireType,
    pub value: UnknownValue,
}

/// The raw payload of an unknown field, sized by its wire type.
#[derive(Debug, Clone, PartialEq)]
pub enum UnknownValue {
    Varint(u64),
    Fixed32(u32),
    Fixed64(u64),
    Bytes(Bytes),
}

impl UnknownField {
    /// Read one unknown field value after its key has been consumed.
    pub(crate) fn read(key: FieldKey, buf: &mut WireBuffer) -> Result<Self, DecodeError> {
        let value = match key.wire_type() {
            WireType::Varint => UnknownValue::Varint(buf.read_varint()?),
            WireType::I64 => UnknownValue::Fixed64(buf.read_fixed64()?),
            WireType::I32 => UnknownValue::Fixed32(buf.read_fixed32()?),
            WireType::Len => UnknownValue::Bytes(buf.read_bytes()?),
            WireType::SGroup | WireType::EGroup => {
                return Err(DecodeError::deprecated_group_encoding().at_offset(buf.tell()));
            }
        };
        Ok(UnknownField {
            index: key.index(),
            wire_type: key.wire_type(),
            value,
        })
    }

    /// Re-emit the field verbatim, key included.
    pub(crate) fn encode(&self, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        buf.write_key(self.index, self.wire_type)?;
        match &self.value {
            UnknownValue::Varint(v) => buf.write_varint(*v),
            UnknownValue::Fixed32(v) => buf.write_fixed32(*v),
            UnknownValue::Fixed64(v) => buf.write_fixed64(*v),
            UnknownValue::Bytes(v) => buf.write_bytes(v),
        }
    }

    /// Encoded length of the field, key included.
    pub(crate) fn encoded_len(&self) -> usize {
        let value_len = match &self.value {
            UnknownValue::Varint(v) => leb128::varint_len_u64(*v),
            UnknownValue::Fixed32(_) => 4,
            UnknownValue::Fixed64(_) => 8,
            UnknownValue::Bytes(v) => {
                leb128::varint_len_u64(u64::try_from(v.len()).unwrap_or(u64::MAX)) + v.len()
            }
        };
        key_len(self.index) + value_len
    }
}
