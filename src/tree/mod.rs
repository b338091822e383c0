//! The JSON tree format.
//!
//! [`JsonEncoder`] runs a value's `encode` against an in-memory tree and then
//! writes that tree as JSON text; [`JsonDecoder`] parses text into a tree and
//! runs `decode` against it. Both go through [`Value`], which can also be used
//! directly with [`JsonEncoder::encode_to_value`] and
//! [`JsonDecoder::decode_value`].

mod boxing;
mod decoder;
mod encoder;
mod node;

use std::rc::Rc;

use log::debug;

use crate::decode::Decodable;
use crate::encode::Encodable;
use crate::error::{Context, DecodingError, EncodingError};
use crate::key::{AnyCodingKey, CodingPath};
use crate::options::{
    DecoderOptions, EncoderOptions, KeyDecodingStrategy, KeyEncodingStrategy,
    NonConformingFloatDecodingStrategy, NonConformingFloatEncodingStrategy, OutputFormatting,
};
use crate::user_info::UserInfo;
use crate::value::Value;

use self::decoder::TreeDecoder;
use self::node::SharedNode;

/// Encodes [`Encodable`] values as JSON.
///
/// ```
/// use codable_tree::{JsonEncoder, OutputFormatting};
///
/// let encoder = JsonEncoder::new().output_formatting(OutputFormatting::Pretty);
/// let text = encoder.encode_to_string(&vec![1, 2]).unwrap();
/// assert_eq!(text, "[\n  1,\n  2\n]");
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonEncoder {
    options: EncoderOptions,
}

impl JsonEncoder {
    pub fn new() -> Self {
        JsonEncoder::default()
    }

    pub fn with_options(options: EncoderOptions) -> Self {
        JsonEncoder { options }
    }

    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    pub fn output_formatting(mut self, formatting: OutputFormatting) -> Self {
        self.options.output_formatting = formatting;
        self
    }

    pub fn key_encoding_strategy(mut self, strategy: KeyEncodingStrategy) -> Self {
        self.options.key_encoding_strategy = strategy;
        self
    }

    pub fn non_conforming_float_encoding_strategy(
        mut self,
        strategy: NonConformingFloatEncodingStrategy,
    ) -> Self {
        self.options.non_conforming_float_encoding_strategy = strategy;
        self
    }

    /// Replaces the key `super_encoder()` writes to.
    pub fn super_key(mut self, key: AnyCodingKey) -> Self {
        self.options.super_key = key;
        self
    }

    pub fn user_info(mut self, user_info: UserInfo) -> Self {
        self.options.user_info = user_info;
        self
    }

    /// Encodes `value` into a tree without rendering it.
    pub fn encode_to_value<T: Encodable>(&self, value: &T) -> Result<Value, EncodingError> {
        let result = encoder::encode_top_level(value, Rc::new(self.options.clone()));
        match &result {
            Ok(_) => debug!("encoded {}", std::any::type_name::<T>()),
            Err(error) => debug!("encoding {} failed: {error}", std::any::type_name::<T>()),
        }
        result
    }

    /// Encodes `value` as UTF-8 JSON.
    pub fn encode<T: Encodable>(&self, value: &T) -> Result<Vec<u8>, EncodingError> {
        let tree = self.encode_to_value(value)?;
        let written = match self.options.output_formatting {
            OutputFormatting::Compact => serde_json::to_vec(&tree),
            OutputFormatting::Pretty => serde_json::to_vec_pretty(&tree),
        };
        written.map_err(|error| {
            EncodingError::invalid_value(
                &tree,
                Context::new(CodingPath::root(), "Unable to write JSON text.")
                    .with_underlying_error(error),
            )
        })
    }

    pub fn encode_to_string<T: Encodable>(&self, value: &T) -> Result<String, EncodingError> {
        let bytes = self.encode(value)?;
        // serde_json only writes UTF-8
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Decodes [`Decodable`] values from JSON.
///
/// ```
/// use codable_tree::JsonDecoder;
///
/// let decoder = JsonDecoder::new();
/// let numbers: Vec<Option<u8>> = decoder.decode_str("[1, null, 3]").unwrap();
/// assert_eq!(numbers, vec![Some(1), None, Some(3)]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonDecoder {
    options: DecoderOptions,
}

impl JsonDecoder {
    pub fn new() -> Self {
        JsonDecoder::default()
    }

    pub fn with_options(options: DecoderOptions) -> Self {
        JsonDecoder { options }
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    pub fn key_decoding_strategy(mut self, strategy: KeyDecodingStrategy) -> Self {
        self.options.key_decoding_strategy = strategy;
        self
    }

    pub fn non_conforming_float_decoding_strategy(
        mut self,
        strategy: NonConformingFloatDecodingStrategy,
    ) -> Self {
        self.options.non_conforming_float_decoding_strategy = strategy;
        self
    }

    /// Replaces the key `super_decoder()` reads from.
    pub fn super_key(mut self, key: AnyCodingKey) -> Self {
        self.options.super_key = key;
        self
    }

    pub fn user_info(mut self, user_info: UserInfo) -> Self {
        self.options.user_info = user_info;
        self
    }

    /// Decodes a `T` out of an already built tree.
    pub fn decode_value<T: Decodable>(&self, value: &Value) -> Result<T, DecodingError> {
        let mut decoder = TreeDecoder::new(
            SharedNode::from(value),
            CodingPath::root(),
            Rc::new(self.options.clone()),
        );
        let result = T::decode(&mut decoder);
        match &result {
            Ok(_) => debug!("decoded {}", std::any::type_name::<T>()),
            Err(error) => debug!("decoding {} failed: {error}", std::any::type_name::<T>()),
        }
        result
    }

    /// Decodes a `T` from UTF-8 JSON.
    pub fn decode<T: Decodable>(&self, bytes: &[u8]) -> Result<T, DecodingError> {
        let tree: Value = serde_json::from_slice(bytes).map_err(invalid_json)?;
        self.decode_value(&tree)
    }

    pub fn decode_str<T: Decodable>(&self, text: &str) -> Result<T, DecodingError> {
        self.decode(text.as_bytes())
    }
}

fn invalid_json(error: serde_json::Error) -> DecodingError {
    DecodingError::data_corrupted(
        Context::new(CodingPath::root(), "The given data was not valid JSON.")
            .with_underlying_error(error),
    )
}
