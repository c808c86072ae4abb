//! The codec algebra: per-type value/wire mappings and combinators.
//!
//! Every codec exposes the same capability set and is object-safe, so the
//! message engine drives any of them through `Arc<dyn Codec>` — including
//! [`MessageCodec`] itself, which is how submessages nest.

mod delimited;
mod message;
mod scalar;
mod transform;
mod variant;

use crate::buffer::WireBuffer;
use crate::error::{DecodeError, EncodeError};
use crate::value::Value;
use crate::wire::WireType;

/// A value/wire mapping for a single protobuf type.
///
/// `encode` writes only the value bytes (no field key); framing is the
/// message engine's job. `encoded_len` must predict `encode` exactly, since
/// length-delimited substructures are sized before they are written.
pub trait Codec: std::fmt::Debug + Send + Sync {
    /// The wire type this codec emits for single-value encoding.
    fn wire_type(&self) -> WireType;

    /// The protobuf default for this codec's value domain.
    fn default_value(&self) -> Value;

    /// Whether `value` equals the default, which elides the field from
    /// output.
    fn is_default(&self, value: &Value) -> bool;

    /// Write one value's bytes.
    fn encode(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError>;

    /// Read one value.
    fn decode(&self, buf: &mut WireBuffer) -> Result<Value, DecodeError>;

    /// Exact byte count `encode` will produce for `value`.
    fn encoded_len(&self, value: &Value) -> Result<usize, EncodeError>;
}

pub use delimited::{BytesCodec, JsonCodec, JsonEncoding, StringCodec};
pub use message::MessageCodec;
pub use scalar::{
    BoolCodec, DoubleCodec, EnumCodec, Fixed32Codec, Fixed64Codec, FloatCodec, Int32Codec,
    Int64Codec, Sfixed32Codec, Sfixed64Codec, Sint32Codec, Sint64Codec, UInt32Codec, UInt64Codec,
};
pub use transform::{Transform, Transformed};
pub use variant::VariantRegistry;
