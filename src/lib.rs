//! # Codable Tree
//!
//! A container-driven encode/decode framework with a JSON tree backend.
//!
//! Types describe their own shape by implementing [`Encodable`] and
//! [`Decodable`] against three kinds of containers:
//! - keyed containers, addressed by [`CodingKey`]s,
//! - unkeyed containers, written in order and read through a cursor,
//! - single-value containers holding one primitive or nested value.
//!
//! Every nested value is processed one level deeper in a [`CodingPath`], and
//! every error carries the full path to the value that failed.
//!
//! ## Features
//! - Object-safe [`Encoder`] / [`Decoder`] roots with typed key access through
//!   [`EncoderExt`] / [`DecoderExt`]
//! - Super encoders and decoders for delegating part of a representation
//! - Built-in conformances for primitives, `Option`, sequences, sets, maps,
//!   tuples, smart pointers, `half::f16` and [`Value`]
//! - Key strategies (snake case or custom), non-conforming float strategies
//!   and a configurable reserved super key
//! - Caller supplied [`UserInfo`] visible to every `encode` / `decode`
//!
//! ## Example
//! ```rust
//! use codable_tree::{
//!     Decodable, Decoder, DecoderExt, DecodingError, Encodable, Encoder, EncoderExt,
//!     EncodingError, coding_keys,
//! };
//!
//! coding_keys! {
//!     enum RecordKeys {
//!         A = "a",
//!         B = "b",
//!     }
//! }
//!
//! #[derive(Debug, PartialEq)]
//! struct Record {
//!     a: i64,
//!     b: Vec<Option<String>>,
//! }
//!
//! impl Encodable for Record {
//!     fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
//!         let mut container = encoder.container::<RecordKeys>();
//!         container.encode(&self.a, RecordKeys::A)?;
//!         container.encode(&self.b, RecordKeys::B)
//!     }
//! }
//!
//! impl Decodable for Record {
//!     fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
//!         let container = decoder.container::<RecordKeys>()?;
//!         Ok(Record {
//!             a: container.decode(RecordKeys::A)?,
//!             b: container.decode(RecordKeys::B)?,
//!         })
//!     }
//! }
//!
//! let record = Record { a: 1, b: vec![Some("x".into()), None] };
//! let json = codable_tree::to_string(&record).unwrap();
//! assert_eq!(json, r#"{"a":1,"b":["x",null]}"#);
//! assert_eq!(codable_tree::from_str::<Record>(&json).unwrap(), record);
//! ```

pub mod decode;
pub mod encode;
pub mod error;
mod impls;
pub mod key;
pub mod options;
mod tree;
pub mod user_info;
pub mod value;

pub use decode::{
    DecodePlace, Decodable, Decoder, DecoderExt, KeyedDecodingContainer,
    KeyedDecodingContainerProtocol, SingleValueDecodingContainer,
    SingleValueDecodingContainerProtocol, UnkeyedDecodingContainer,
    UnkeyedDecodingContainerProtocol,
};
pub use encode::{
    Encodable, Encoder, EncoderExt, KeyedEncodingContainer, KeyedEncodingContainerProtocol,
    SingleValueEncodingContainer, SingleValueEncodingContainerProtocol, UnkeyedEncodingContainer,
    UnkeyedEncodingContainerProtocol,
};
pub use error::{Context, DecodingError, EncodingError};
pub use impls::MapKey;
pub use key::{AnyCodingKey, CodingKey, CodingPath};
pub use options::{
    DecoderOptions, EncoderOptions, KeyDecodingStrategy, KeyEncodingStrategy,
    NonConformingFloatDecodingStrategy, NonConformingFloatEncodingStrategy, OutputFormatting,
};
pub use tree::{JsonDecoder, JsonEncoder};
pub use user_info::{CodingUserInfoKey, UserInfo};
pub use value::Value;

// Convenience functions
pub fn to_value<T: Encodable>(value: &T) -> Result<Value, EncodingError> {
    JsonEncoder::new().encode_to_value(value)
}

pub fn to_vec<T: Encodable>(value: &T) -> Result<Vec<u8>, EncodingError> {
    JsonEncoder::new().encode(value)
}

pub fn to_string<T: Encodable>(value: &T) -> Result<String, EncodingError> {
    JsonEncoder::new().encode_to_string(value)
}

pub fn from_value<T: Decodable>(value: &Value) -> Result<T, DecodingError> {
    JsonDecoder::new().decode_value(value)
}

pub fn from_slice<T: Decodable>(slice: &[u8]) -> Result<T, DecodingError> {
    JsonDecoder::new().decode(slice)
}

pub fn from_str<T: Decodable>(text: &str) -> Result<T, DecodingError> {
    JsonDecoder::new().decode_str(text)
}
