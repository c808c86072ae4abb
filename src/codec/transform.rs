//! The transform combinator: a bijective value mapping wrapped around any
//! codec, transparent to the wire.

use std::fmt;
use std::sync::Arc;

use crate::buffer::WireBuffer;
use crate::error::{DecodeError, EncodeError};
use crate::value::Value;
use crate::wire::WireType;

use super::Codec;

type EncodeFn = Arc<dyn Fn(Value) -> Result<Value, EncodeError> + Send + Sync>;
type DecodeFn = Arc<dyn Fn(Value) -> Result<Value, DecodeError> + Send + Sync>;

/// A pre-encode / post-decode bijection between a user value domain and a
/// codec's wire value domain.
///
/// `encode` maps user values into the wrapped codec's domain; `decode` maps
/// decoded values back. `default` is the user-domain default and governs
/// field elision. Transforms compose: wrapping an already-transformed codec
/// applies the outer mapping first on encode and last on decode.
#[derive(Clone)]
pub struct Transform {
    encode: EncodeFn,
    decode: DecodeFn,
    default: Value,
}

impl Transform {
    pub fn new<E, D>(encode: E, decode: D, default: impl Into<Value>) -> Self
    where
        E: Fn(Value) -> Result<Value, EncodeError> + Send + Sync + 'static,
        D: Fn(Value) -> Result<Value, DecodeError> + Send + Sync + 'static,
    {
        Transform {
            encode: Arc::new(encode),
            decode: Arc::new(decode),
            default: default.into(),
        }
    }

    /// Convenience constructor for mappings that cannot fail.
    pub fn infallible<E, D>(encode: E, decode: D, default: impl Into<Value>) -> Self
    where
        E: Fn(Value) -> Value + Send + Sync + 'static,
        D: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Transform::new(
            move |value| Ok(encode(value)),
            move |value| Ok(decode(value)),
            default,
        )
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    pub(crate) fn apply_encode(&self, value: Value) -> Result<Value, EncodeError> {
        (self.encode)(value)
    }

    pub(crate) fn apply_decode(&self, value: Value) -> Result<Value, DecodeError> {
        (self.decode)(value)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

/// A codec whose value domain has been remapped by a [`Transform`].
///
/// Delegates every wire concern to the wrapped codec; only the value domain
/// changes.
#[derive(Debug, Clone)]
pub struct Transformed {
    inner: Arc<dyn Codec>,
    transform: Transform,
}

impl Transformed {
    pub fn new(inner: Arc<dyn Codec>, transform: Transform) -> Self {
        Transformed { inner, transform }
    }
}

impl Codec for Transformed {
    fn wire_type(&self) -> WireType {
        self.inner.wire_type()
    }

    fn default_value(&self) -> Value {
        self.transform.default_value().clone()
    }

    fn is_default(&self, value: &Value) -> bool {
        value == self.transform.default_value()
    }

    fn encode(&self, value: &Value, buf: &mut WireBuffer) -> Result<(), EncodeError> {
        let mapped = self.transform.apply_encode(value.clone())?;
        self.inner.encode(&mapped, buf)
    }

    fn decode(&self, buf: &mut WireBuffer) -> Result<Value, DecodeError> {
        let raw = self.inner.decode(buf)?;
        self.transform.apply_decode(raw)
    }

    fn encoded_len(&self, value: &Value) -> Result<usize, EncodeError> {
        let mapped = self.transform.apply_encode(value.clone())?;
        self.inner.encoded_len(&mapped)
    }
}
