//! A declarative binary struct codec: schemas are data, compiled once into a byte layout,
//! then used to encode/decode values against arbitrary buffers at runtime.
//!
//! ```
//! use struct_codec::{FieldDecl, Struct, Value};
//!
//! let header = Struct::from_shorthand(vec![
//!     ("version", "UInt8:4"),
//!     ("flags", "UInt8:4"),
//!     ("length", "UInt16LE"),
//! ]).unwrap();
//!
//! let mut fields = struct_codec::Fields::new();
//! fields.insert("version".to_string(), Value::Int(1));
//! fields.insert("flags".to_string(), Value::Int(0));
//! fields.insert("length".to_string(), Value::Int(64));
//!
//! let encoded = header.encode(&Value::Struct(fields)).unwrap();
//! let decoded = header.decode(&encoded).unwrap();
//! assert_eq!(decoded.as_struct().unwrap().get("length"), Some(&Value::Int(64)));
//! ```

mod accessor;
mod bitfield;
mod dynamic;
mod error;
mod nested;
mod primitive;
mod registry;
mod schema;
mod strings;
mod struct_codec;
mod union_codec;
mod value;

pub use error::{Error, Result};
pub use registry::PrimitiveType;
pub use schema::{FieldDecl, StringEncoding, StringField, StringSpec};
pub use struct_codec::Struct;
pub use union_codec::Union;
pub use value::{Fields, Value};
