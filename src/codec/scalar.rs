//! Scalar codecs: booleans, the varint integer flavors, fixed-width
//! integers, floats, and open enums.

// Sign reinterpretation and truncation casts in this module follow the
// protobuf wire rules and have been reviewed for correctness.
#![allow(clippy::as_conversions)]

use crate::buffer::WireBuffer;
use crate::error::{DecodeError, EncodeError};
use crate::leb128;
use crate::value::Value;
use crate::wire::WireType;

use super::Codec;

fn expect<T>(extracted: Option<T>, expected: &'static str, value: &Value) -> Result<T, EncodeError> {
    extracted.ok_or_else(|| EncodeError::wrong_value_kind(expected, value.kind()))
}

/// Protobuf `bool`: `0` or `1` varint; any non-zero decodes as true.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolCodec;

impl Codec for BoolCodec {
    fn wire_type(&self) -> WireType {
        WireType::Varint
    }

    fn default_value(&self) -> Value {
        Value::Bool(false)
    }

    fn is_default(&self, value: &Value) -> bool {
        value.as_bool() == Some(false)
    }

    fn encode(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        let v = expect(value.as_bool(), "bool", value)?;
        buf.write_varint(u64::from(v))
    }

    fn decode(&self, buf: &mut WireBuffer) -> Result<Value, DecodeError> {
        Ok(Value::Bool(buf.read_varint()? != 0))
    }

    fn encoded_len(&self, value: &Value) -> Result<usize, EncodeError> {
        expect(value.as_bool(), "bool", value)?;
        Ok(1)
    }
}

/// Protobuf `int32`: varint, sign-extended to 64 bits when negative.
#[derive(Debug, Clone, Copy, Default)]
pub struct Int32Codec;

impl Codec for Int32Codec {
    fn wire_type(&self) -> WireType {
        WireType::Varint
    }

    fn default_value(&self) -> Value {
        Value::Int32(0)
    }

    fn is_default(&self, value: &Value) -> bool {
        value.as_i32() == Some(0)
    }

    fn encode(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        let v = expect(value.as_i32(), "int32", value)?;
        buf.write_signed_varint(i64::from(v))
    }

    fn decode(&self, buf: &mut WireBuffer) -> Result<Value, DecodeError> {
        // The decoded u64 carries the sign extension; keep the low 32 bits.
        Ok(Value::Int32(buf.read_varint()? as i32))
    }

    fn encoded_len(&self, value: &Value) -> Result<usize, EncodeError> {
        let v = expect(value.as_i32(), "int32", value)?;
        Ok(leb128::varint_len(i64::from(v)))
    }
}

/// Protobuf `int64`: varint under two's complement reinterpretation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Int64Codec;

impl Codec for Int64Codec {
    fn wire_type(&self) -> WireType {
        WireType::Varint
    }

    fn default_value(&self) -> Value {
        Value::Int64(0)
    }

    fn is_default(&self, value: &Value) -> bool {
        value.as_i64() == Some(0)
    }

    fn encode(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        let v = expect(value.as_i64(), "int64", value)?;
        buf.write_signed_varint(v)
    }

    fn decode(&self, buf: &mut WireBuffer) -> Result<Value, DecodeError> {
        Ok(Value::Int64(buf.read_signed_varint()?))
    }

    fn encoded_len(&self, value: &Value) -> Result<usize, EncodeError> {
        let v = expect(value.as_i64(), "int64", value)?;
        Ok(leb128::varint_len(v))
    }
}

/// Protobuf `uint32`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UInt32Codec;

impl Codec for UInt32Codec {
    fn wire_type(&self) -> WireType {
        WireType::Varint
    }

    fn default_value(&self) -> Value {
        Value::UInt32(0)
    }

    fn is_default(&self, value: &Value) -> bool {
        value.as_u32() == Some(0)
    }

    fn encode(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        let v = expect(value.as_u32(), "uint32", value)?;
        buf.write_varint(u64::from(v))
    }

    fn decode(&self, buf: &mut WireBuffer) -> Result<Value, DecodeError> {
        Ok(Value::UInt32(buf.read_varint()? as u32))
    }

    fn encoded_len(&self, value: &Value) -> Result<usize, EncodeError> {
        let v = expect(value.as_u32(), "uint32", value)?;
        Ok(leb128::varint_len_u64(u64::from(v)))
    }
}

/// Protobuf `uint64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UInt64Codec;

impl Codec for UInt64Codec {
    fn wire_type(&self) -> WireType {
        WireType::Varint
    }

    fn default_value(&self) -> Value {
        Value::UInt64(0)
    }

    fn is_default(&self, value: &Value) -> bool {
        value.as_u64() == Some(0)
    }

    fn encode(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        let v = expect(value.as_u64(), "uint64", value)?;
        buf.write_varint(v)
    }

    fn decode(&self, buf: &mut WireBuffer) -> Result<Value, DecodeError> {
        Ok(Value::UInt64(buf.read_varint()?))
    }

    fn encoded_len(&self, value: &Value) -> Result<usize, EncodeError> {
        let v = expect(value.as_u64(), "uint64", value)?;
        Ok(leb128::varint_len_u64(v))
    }
}

/// Protobuf `sint32`: zigzag over varint.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sint32Codec;

impl Codec for Sint32Codec {
    fn wire_type(&self) -> WireType {
        WireType::Varint
    }

    fn default_value(&self) -> Value {
        Value::Int32(0)
    }

    fn is_default(&self, value: &Value) -> bool {
        value.as_i32() == Some(0)
    }

    fn encode(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        let v = expect(value.as_i32(), "int32", value)?;
        buf.write_zigzag(i64::from(v))
    }

    fn decode(&self, buf: &mut WireBuffer) -> Result<Value, DecodeError> {
        Ok(Value::Int32(buf.read_zigzag()? as i32))
    }

    fn encoded_len(&self, value: &Value) -> Result<usize, EncodeError> {
        let v = expect(value.as_i32(), "int32", value)?;
        Ok(leb128::zigzag_len(i64::from(v)))
    }
}

/// Protobuf `sint64`: zigzag over varint.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sint64Codec;

impl Codec for Sint64Codec {
    fn wire_type(&self) -> WireType {
        WireType::Varint
    }

    fn default_value(&self) -> Value {
        Value::Int64(0)
    }

    fn is_default(&self, value: &Value) -> bool {
        value.as_i64() == Some(0)
    }

    fn encode(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        let v = expect(value.as_i64(), "int64", value)?;
        buf.write_zigzag(v)
    }

    fn decode(&self, buf: &mut WireBuffer) -> Result<Value, DecodeError> {
        Ok(Value::Int64(buf.read_zigzag()?))
    }

    fn encoded_len(&self, value: &Value) -> Result<usize, EncodeError> {
        let v = expect(value.as_i64(), "int64", value)?;
        Ok(leb128::zigzag_len(v))
    }
}

/// Protobuf `fixed32`: 4 little-endian bytes, unsigned.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fixed32Codec;

impl Codec for Fixed32Codec {
    fn wire_type(&self) -> WireType {
        WireType::I32
    }

    fn default_value(&self) -> Value {
        Value::UInt32(0)
    }

    fn is_default(&self, value: &Value) -> bool {
        value.as_u32() == Some(0)
    }

    fn encode(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        let v = expect(value.as_u32(), "uint32", value)?;
        buf.write_fixed32(v)
    }

    fn decode(&self, buf: &mut WireBuffer) -> Result<Value, DecodeError> {
        Ok(Value::UInt32(buf.read_fixed32()?))
    }

    fn encoded_len(&self, value: &Value) -> Result<usize, EncodeError> {
        expect(value.as_u32(), "uint32", value)?;
        Ok(4)
    }
}

/// Protobuf `fixed64`: 8 little-endian bytes, unsigned.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fixed64Codec;

impl Codec for Fixed64Codec {
    fn wire_type(&self) -> WireType {
        WireType::I64
    }

    fn default_value(&self) -> Value {
        Value::UInt64(0)
    }

    fn is_default(&self, value: &Value) -> bool {
        value.as_u64() == Some(0)
    }

    fn encode(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        let v = expect(value.as_u64(), "uint64", value)?;
        buf.write_fixed64(v)
    }

    fn decode(&self, buf: &mut WireBuffer) -> Result<Value, DecodeError> {
        Ok(Value::UInt64(buf.read_fixed64()?))
    }

    fn encoded_len(&self, value: &Value) -> Result<usize, EncodeError> {
        expect(value.as_u64(), "uint64", value)?;
        Ok(8)
    }
}

/// Protobuf `sfixed32`: 4 little-endian bytes, signed interpretation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sfixed32Codec;

impl Codec for Sfixed32Codec {
    fn wire_type(&self) -> WireType {
        WireType::I32
    }

    fn default_value(&self) -> Value {
        Value::Int32(0)
    }

    fn is_default(&self, value: &Value) -> bool {
        value.as_i32() == Some(0)
    }

    fn encode(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        let v = expect(value.as_i32(), "int32", value)?;
        buf.write_sfixed32(v)
    }

    fn decode(&self, buf: &mut WireBuffer) -> Result<Value, DecodeError> {
        Ok(Value::Int32(buf.read_sfixed32()?))
    }

    fn encoded_len(&self, value: &Value) -> Result<usize, EncodeError> {
        expect(value.as_i32(), "int32", value)?;
        Ok(4)
    }
}

/// Protobuf `sfixed64`: 8 little-endian bytes, signed interpretation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sfixed64Codec;

impl Codec for Sfixed64Codec {
    fn wire_type(&self) -> WireType {
        WireType::I64
    }

    fn default_value(&self) -> Value {
        Value::Int64(0)
    }

    fn is_default(&self, value: &Value) -> bool {
        value.as_i64() == Some(0)
    }

    fn encode(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        let v = expect(value.as_i64(), "int64", value)?;
        buf.write_sfixed64(v)
    }

    fn decode(&self, buf: &mut WireBuffer) -> Result<Value, DecodeError> {
        Ok(Value::Int64(buf.read_sfixed64()?))
    }

    fn encoded_len(&self, value: &Value) -> Result<usize, EncodeError> {
        expect(value.as_i64(), "int64", value)?;
        Ok(8)
    }
}

/// Protobuf `float`: IEEE-754 single, little-endian.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatCodec;

impl Codec for FloatCodec {
    fn wire_type(&self) -> WireType {
        WireType::I32
    }

    fn default_value(&self) -> Value {
        Value::Float(0.0)
    }

    fn is_default(&self, value: &Value) -> bool {
        value.as_f32() == Some(0.0)
    }

    fn encode(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        let v = expect(value.as_f32(), "float", value)?;
        buf.write_float(v)
    }

    fn decode(&self, buf: &mut WireBuffer) -> Result<Value, DecodeError> {
        Ok(Value::Float(buf.read_float()?))
    }

    fn encoded_len(&self, value: &Value) -> Result<usize, EncodeError> {
        expect(value.as_f32(), "float", value)?;
        Ok(4)
    }
}

/// Protobuf `double`: IEEE-754 double, little-endian.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleCodec;

impl Codec for DoubleCodec {
    fn wire_type(&self) -> WireType {
        WireType::I64
    }

    fn default_value(&self) -> Value {
        Value::Double(0.0)
    }

    fn is_default(&self, value: &Value) -> bool {
        value.as_f64() == Some(0.0)
    }

    fn encode(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        let v = expect(value.as_f64(), "double", value)?;
        buf.write_double(v)
    }

    fn decode(&self, buf: &mut WireBuffer) -> Result<Value, DecodeError> {
        Ok(Value::Double(buf.read_double()?))
    }

    fn encoded_len(&self, value: &Value) -> Result<usize, EncodeError> {
        expect(value.as_f64(), "double", value)?;
        Ok(8)
    }
}

/// An open protobuf enum: any integer is accepted on the wire.
///
/// Behaves exactly like `int32`; closed enums are out of scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumCodec;

impl Codec for EnumCodec {
    fn wire_type(&self) -> WireType {
        WireType::Varint
    }

    fn default_value(&self) -> Value {
        Value::Int32(0)
    }

    fn is_default(&self, value: &Value) -> bool {
        value.as_i32() == Some(0)
    }

    fn encode(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        let v = expect(value.as_i32(), "int32", value)?;
        buf.write_signed_varint(i64::from(v))
    }

    fn decode(&self, buf: &mut WireBuffer) -> Result<Value, DecodeError> {
        Ok(Value::Int32(buf.read_varint()? as i32))
    }

    fn encoded_len(&self, value: &Value) -> Result<usize, EncodeError> {
        let v = expect(value.as_i32(), "int32", value)?;
        Ok(leb128::varint_len(i64::from(v)))
    }
}
