//! Runtime schema-driven encoder/decoder for the Protocol Buffers wire format.
//!
//! Message types are declared programmatically instead of compiled from
//! `.proto` files. A single declaration yields both a dynamic value
//! representation ([`value::Value`]) and a byte-exact codec
//! ([`codec::MessageCodec`]).
//!
//! ```
//! use protoflex::schema::{self, message};
//! use protoflex::value::MessageValue;
//!
//! let point = message([
//!     ("x", schema::sint32(1)),
//!     ("y", schema::sint32(2)),
//! ])
//! .unwrap();
//!
//! let value = MessageValue::new().with("x", -2).with("y", 3);
//! let buf = point.encode(&value.into()).unwrap();
//! let decoded = point.decode(buf.written_bytes()).unwrap();
//! ```

#![deny(clippy::as_conversions)]

pub mod buffer;
pub mod codec;
pub mod error;
pub mod leb128;
pub mod schema;
pub mod value;
pub mod wire;

pub use buffer::WireBuffer;
pub use codec::{Codec, JsonEncoding, MessageCodec, Transform, VariantRegistry};
pub use error::{DecodeError, EncodeError, SchemaError};
pub use schema::{message, FieldSchema, Repeated};
pub use value::{MessageValue, UnknownField, UnknownValue, Value};
