//! Per-instance encoder and decoder configuration.
//!
//! Everything a pass needs is passed in explicitly through [`EncoderOptions`] or
//! [`DecoderOptions`]; there is no process-wide policy state.

use std::fmt;
use std::sync::Arc;

use heck::{ToLowerCamelCase, ToSnakeCase};

use crate::key::{AnyCodingKey, CodingKey, CodingPath};
use crate::user_info::UserInfo;

/// Maps the full coding path of a key (the key itself last) to the key to use.
pub type KeyConverter = Arc<dyn Fn(&[AnyCodingKey]) -> AnyCodingKey + Send + Sync>;

/// Layout of the JSON text produced by [`JsonEncoder`](crate::JsonEncoder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormatting {
    #[default]
    Compact,
    Pretty,
}

/// How keys are written into keyed containers.
#[derive(Clone, Default)]
pub enum KeyEncodingStrategy {
    /// Use each key's string value as is.
    #[default]
    UseDefaultKeys,
    /// `camelCase` keys become `snake_case`.
    ConvertToSnakeCase,
    Custom(KeyConverter),
}

/// How keys found in the tree are matched against requested keys.
#[derive(Clone, Default)]
pub enum KeyDecodingStrategy {
    #[default]
    UseDefaultKeys,
    /// `snake_case` keys in the tree are read as `camelCase`.
    ConvertFromSnakeCase,
    Custom(KeyConverter),
}

/// What to do with infinite and NaN floats, which JSON cannot represent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NonConformingFloatEncodingStrategy {
    /// Fail with `EncodingError::InvalidValue`.
    #[default]
    Throw,
    /// Write the given sentinel strings instead.
    ConvertToString {
        positive_infinity: String,
        negative_infinity: String,
        nan: String,
    },
}

/// Inverse of [`NonConformingFloatEncodingStrategy`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NonConformingFloatDecodingStrategy {
    /// Strings never decode as floats.
    #[default]
    Throw,
    /// Strings equal to a sentinel decode as the matching non-finite float.
    ConvertFromString {
        positive_infinity: String,
        negative_infinity: String,
        nan: String,
    },
}

/// Configuration for one encoding pass.
#[derive(Debug, Clone)]
pub struct EncoderOptions {
    pub output_formatting: OutputFormatting,
    pub key_encoding_strategy: KeyEncodingStrategy,
    pub non_conforming_float_encoding_strategy: NonConformingFloatEncodingStrategy,
    /// Key written by `super_encoder()`. It is written verbatim, the key
    /// encoding strategy never applies to it, and `super_decoder()` reads it
    /// the same way. Collides with a genuine field of the same name; change it
    /// when a type needs both.
    pub super_key: AnyCodingKey,
    pub user_info: UserInfo,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        EncoderOptions {
            output_formatting: OutputFormatting::default(),
            key_encoding_strategy: KeyEncodingStrategy::default(),
            non_conforming_float_encoding_strategy: NonConformingFloatEncodingStrategy::default(),
            super_key: AnyCodingKey::super_key(),
            user_info: UserInfo::default(),
        }
    }
}

/// Configuration for one decoding pass.
#[derive(Debug, Clone)]
pub struct DecoderOptions {
    pub key_decoding_strategy: KeyDecodingStrategy,
    pub non_conforming_float_decoding_strategy: NonConformingFloatDecodingStrategy,
    /// Key read by `super_decoder()`, verbatim and outside the key decoding
    /// strategy.
    pub super_key: AnyCodingKey,
    pub user_info: UserInfo,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        DecoderOptions {
            key_decoding_strategy: KeyDecodingStrategy::default(),
            non_conforming_float_decoding_strategy: NonConformingFloatDecodingStrategy::default(),
            super_key: AnyCodingKey::super_key(),
            user_info: UserInfo::default(),
        }
    }
}

impl KeyEncodingStrategy {
    /// The string a keyed container at `path` stores `key` under.
    pub(crate) fn convert<K: CodingKey + ?Sized>(&self, path: &CodingPath, key: &K) -> String {
        match self {
            KeyEncodingStrategy::UseDefaultKeys => key.string_value().to_owned(),
            KeyEncodingStrategy::ConvertToSnakeCase => convert_to_snake_case(key.string_value()),
            KeyEncodingStrategy::Custom(converter) => {
                let full = path.appending(key);
                converter(full.keys()).string_value().to_owned()
            }
        }
    }
}

impl KeyDecodingStrategy {
    pub(crate) fn is_default(&self) -> bool {
        matches!(self, KeyDecodingStrategy::UseDefaultKeys)
    }

    /// The key a tree entry named `raw` under `path` answers to.
    pub(crate) fn convert(&self, path: &CodingPath, raw: &str) -> String {
        match self {
            KeyDecodingStrategy::UseDefaultKeys => raw.to_owned(),
            KeyDecodingStrategy::ConvertFromSnakeCase => convert_from_snake_case(raw),
            KeyDecodingStrategy::Custom(converter) => {
                let full = path.appending(&AnyCodingKey::new(raw));
                converter(full.keys()).string_value().to_owned()
            }
        }
    }
}

impl fmt::Debug for KeyEncodingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KeyEncodingStrategy::UseDefaultKeys => f.write_str("UseDefaultKeys"),
            KeyEncodingStrategy::ConvertToSnakeCase => f.write_str("ConvertToSnakeCase"),
            KeyEncodingStrategy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl fmt::Debug for KeyDecodingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KeyDecodingStrategy::UseDefaultKeys => f.write_str("UseDefaultKeys"),
            KeyDecodingStrategy::ConvertFromSnakeCase => f.write_str("ConvertFromSnakeCase"),
            KeyDecodingStrategy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Splits a camel case key into lowercase words joined by `_`, keeping
/// leading and trailing underscores.
///
/// ```
/// use codable_tree::options::convert_to_snake_case;
///
/// assert_eq!(convert_to_snake_case("oneTwoThree"), "one_two_three");
/// assert_eq!(convert_to_snake_case("myURLValue"), "my_url_value");
/// assert_eq!(convert_to_snake_case("_private"), "_private");
/// ```
pub fn convert_to_snake_case(key: &str) -> String {
    with_outer_underscores(key, |body| body.to_snake_case())
}

/// Joins `_` separated words into camel case, keeping leading and trailing
/// underscores. A key without inner underscores is left as is.
///
/// ```
/// use codable_tree::options::convert_from_snake_case;
///
/// assert_eq!(convert_from_snake_case("one_two_three"), "oneTwoThree");
/// assert_eq!(convert_from_snake_case("_private_key_"), "_privateKey_");
/// assert_eq!(convert_from_snake_case("plain"), "plain");
/// ```
pub fn convert_from_snake_case(key: &str) -> String {
    with_outer_underscores(key, |body| {
        if body.contains('_') {
            body.to_lower_camel_case()
        } else {
            body.to_owned()
        }
    })
}

fn with_outer_underscores(key: &str, convert: impl FnOnce(&str) -> String) -> String {
    let body = key.trim_matches('_');
    if body.is_empty() {
        return key.to_owned();
    }
    let leading = key.len() - key.trim_start_matches('_').len();
    let trailing = key.len() - key.trim_end_matches('_').len();
    format!(
        "{}{}{}",
        &key[..leading],
        convert(body),
        &key[key.len() - trailing..]
    )
}
