//! Length-delimited codecs: strings, raw bytes, and JSON payloads.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;

use crate::buffer::WireBuffer;
use crate::error::{DecodeError, DecodeErrorKind, EncodeError, EncodeErrorKind};
use crate::leb128;
use crate::value::Value;
use crate::wire::WireType;

use super::Codec;

/// Protobuf `string`: varint length followed by UTF-8 bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl Codec for StringCodec {
    fn wire_type(&self) -> WireType {
        WireType::Len
    }

    fn default_value(&self) -> Value {
        Value::String(String::new())
    }

    fn is_default(&self, value: &Value) -> bool {
        value.as_str() == Some("")
    }

    fn encode(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        let v = value
            .as_str()
            .ok_or_else(|| EncodeError::wrong_value_kind("string", value.kind()))?;
        buf.write_string(v)
    }

    fn decode(&self, buf: &mut WireBuffer) -> Result<Value, DecodeError> {
        Ok(Value::String(buf.read_string()?))
    }

    fn encoded_len(&self, value: &Value) -> Result<usize, EncodeError> {
        let v = value
            .as_str()
            .ok_or_else(|| EncodeError::wrong_value_kind("string", value.kind()))?;
        len_prefixed(v.len())
    }
}

/// Protobuf `bytes`: varint length followed by raw bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl Codec for BytesCodec {
    fn wire_type(&self) -> WireType {
        WireType::Len
    }

    fn default_value(&self) -> Value {
        Value::Bytes(Bytes::new())
    }

    fn is_default(&self, value: &Value) -> bool {
        value.as_bytes().is_some_and(|b| b.is_empty())
    }

    fn encode(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        let v = value
            .as_bytes()
            .ok_or_else(|| EncodeError::wrong_value_kind("bytes", value.kind()))?;
        buf.write_bytes(v)
    }

    fn decode(&self, buf: &mut WireBuffer) -> Result<Value, DecodeError> {
        Ok(Value::Bytes(buf.read_bytes()?))
    }

    fn encoded_len(&self, value: &Value) -> Result<usize, EncodeError> {
        let v = value
            .as_bytes()
            .ok_or_else(|| EncodeError::wrong_value_kind("bytes", value.kind()))?;
        len_prefixed(v.len())
    }
}

/// Total length of a length-delimited payload including its framing varint.
fn len_prefixed(len: usize) -> Result<usize, EncodeError> {
    let framed = u64::try_from(len).map_err(|_| EncodeError::payload_too_long(len))?;
    if u32::try_from(len).is_err() {
        return Err(EncodeError::payload_too_long(len));
    }
    Ok(leb128::varint_len_u64(framed) + len)
}

/// The byte-level rendition a [`JsonCodec`] applies after stringifying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonEncoding {
    /// The JSON text itself, UTF-8.
    #[default]
    Raw,
    /// Standard-alphabet base64 of the JSON text.
    Base64,
    /// Lowercase hex of the JSON text.
    Hex,
}

/// Arbitrary JSON carried as a protobuf string field.
///
/// Values are stringified with `serde_json`, passed through the configured
/// byte-level encoding, and framed exactly like a string. The default value
/// is an empty JSON object.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    encoding: JsonEncoding,
}

impl JsonCodec {
    pub fn new(encoding: JsonEncoding) -> Self {
        JsonCodec { encoding }
    }

    fn stringify(&self, value: &Value) -> Result<String, EncodeError> {
        let v = value
            .as_json()
            .ok_or_else(|| EncodeError::wrong_value_kind("json", value.kind()))?;
        let text = serde_json::to_string(v).map_err(|err| {
            EncodeError::new(EncodeErrorKind::Json {
                message: err.to_string(),
            })
        })?;
        Ok(match self.encoding {
            JsonEncoding::Raw => text,
            JsonEncoding::Base64 => BASE64.encode(text.as_bytes()),
            JsonEncoding::Hex => hex::encode(text.as_bytes()),
        })
    }
}

impl Codec for JsonCodec {
    fn wire_type(&self) -> WireType {
        WireType::Len
    }

    fn default_value(&self) -> Value {
        Value::Json(serde_json::Value::Object(serde_json::Map::new()))
    }

    fn is_default(&self, value: &Value) -> bool {
        match value.as_json() {
            Some(serde_json::Value::Object(map)) => map.is_empty(),
            _ => false,
        }
    }

    fn encode(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        buf.write_string(&self.stringify(value)?)
    }

    fn decode(&self, buf: &mut WireBuffer) -> Result<Value, DecodeError> {
        let start = buf.tell();
        let text = buf.read_string()?;
        let json_text = match self.encoding {
            JsonEncoding::Raw => text.into_bytes(),
            JsonEncoding::Base64 => BASE64.decode(text.as_bytes()).map_err(|err| {
                DecodeError::new(DecodeErrorKind::Json {
                    message: err.to_string(),
                })
                .at_offset(start)
            })?,
            JsonEncoding::Hex => hex::decode(text.as_bytes()).map_err(|err| {
                DecodeError::new(DecodeErrorKind::InvalidHex {
                    message: err.to_string(),
                })
                .at_offset(start)
            })?,
        };
        let parsed = serde_json::from_slice(&json_text).map_err(|err| {
            DecodeError::new(DecodeErrorKind::Json {
                message: err.to_string(),
            })
            .at_offset(start)
        })?;
        Ok(Value::Json(parsed))
    }

    fn encoded_len(&self, value: &Value) -> Result<usize, EncodeError> {
        len_prefixed(self.stringify(value)?.len())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[track_caller]
    fn roundtrip(codec: &dyn Codec, value: Value) {
        let mut buf = WireBuffer::new();
        codec.encode(&value, &mut buf).unwrap();
        assert_eq!(buf.written_len(), codec.encoded_len(&value).unwrap());
        buf.seek(0).unwrap();
        assert_eq!(codec.decode(&mut buf).unwrap(), value);
    }

    #[test]
    fn test_string_roundtrip() {
        roundtrip(&StringCodec, Value::String(String::new()));
        roundtrip(&StringCodec, Value::String("TEST".to_owned()));
        roundtrip(&StringCodec, Value::String("héllo wörld".to_owned()));
        roundtrip(&StringCodec, Value::String("x".repeat(300)));
    }

    #[test]
    fn test_string_wire_layout() {
        let mut buf = WireBuffer::new();
        StringCodec
            .encode(&Value::String("TEST".to_owned()), &mut buf)
            .unwrap();
        assert_eq!(buf.written_bytes(), &[0x04, 0x54, 0x45, 0x53, 0x54]);
    }

    #[test]
    fn test_bytes_roundtrip() {
        roundtrip(&BytesCodec, Value::Bytes(Bytes::new()));
        roundtrip(&BytesCodec, Value::Bytes(Bytes::from_static(&[0, 1, 255])));
    }

    #[test]
    fn test_json_roundtrip_all_encodings() {
        let payload = json!({"name": "ada", "scores": [1, 2, 3], "ok": true});
        for encoding in [JsonEncoding::Raw, JsonEncoding::Base64, JsonEncoding::Hex] {
            roundtrip(&JsonCodec::new(encoding), Value::Json(payload.clone()));
        }
    }

    #[test]
    fn test_json_default_is_empty_object() {
        let codec = JsonCodec::default();
        assert!(codec.is_default(&codec.default_value()));
        assert!(!codec.is_default(&Value::Json(json!({"a": 1}))));
        assert!(!codec.is_default(&Value::Json(json!(null))));
    }

    #[test]
    fn test_json_rejects_garbage() {
        let mut buf = WireBuffer::new();
        buf.write_string("not json").unwrap();
        buf.seek(0).unwrap();
        let err = JsonCodec::default().decode(&mut buf).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::Json { .. }));
    }

    #[test]
    fn test_defaults() {
        assert!(StringCodec.is_default(&Value::String(String::new())));
        assert!(!StringCodec.is_default(&Value::Bytes(Bytes::new())));
        assert!(BytesCodec.is_default(&Value::Bytes(Bytes::new())));
    }
}
