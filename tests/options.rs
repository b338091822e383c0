// Copyright 2026 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Encoder and decoder configuration: key strategies, float strategies,
// user info and output formatting.

use std::sync::Arc;

use codable_tree::{
    AnyCodingKey, CodingKey, CodingUserInfoKey, Decodable, Decoder, DecoderExt, DecodingError,
    Encodable, Encoder, EncoderExt, EncodingError, JsonDecoder, JsonEncoder, KeyDecodingStrategy,
    KeyEncodingStrategy, NonConformingFloatDecodingStrategy, NonConformingFloatEncodingStrategy,
    OutputFormatting, UserInfo, coding_keys,
};

coding_keys! {
    enum ProfileKeys {
        UserName = "userName",
        CreatedAt = "createdAt",
    }
}

#[derive(Debug, PartialEq)]
struct Profile {
    user_name: String,
    created_at: u32,
}

impl Encodable for Profile {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        let mut container = encoder.container::<ProfileKeys>();
        container.encode_str(&self.user_name, ProfileKeys::UserName)?;
        container.encode_u32(self.created_at, ProfileKeys::CreatedAt)
    }
}

impl Decodable for Profile {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
        let container = decoder.container::<ProfileKeys>()?;
        Ok(Profile {
            user_name: container.decode_string(ProfileKeys::UserName)?,
            created_at: container.decode_u32(ProfileKeys::CreatedAt)?,
        })
    }
}

fn profile() -> Profile {
    Profile {
        user_name: "ada".to_string(),
        created_at: 1815,
    }
}

#[test]
fn test_snake_case_keys() {
    let json = JsonEncoder::new()
        .key_encoding_strategy(KeyEncodingStrategy::ConvertToSnakeCase)
        .encode_to_string(&profile())
        .unwrap();
    assert_eq!(json, r#"{"created_at":1815,"user_name":"ada"}"#);

    let back: Profile = JsonDecoder::new()
        .key_decoding_strategy(KeyDecodingStrategy::ConvertFromSnakeCase)
        .decode_str(&json)
        .unwrap();
    assert_eq!(back, profile());

    // without the strategy the snake case keys are simply missing
    let error = JsonDecoder::new().decode_str::<Profile>(&json).unwrap_err();
    assert!(matches!(error, DecodingError::KeyNotFound { .. }));
}

#[test]
fn test_custom_key_strategies_see_the_full_path() {
    let depth_prefix = KeyEncodingStrategy::Custom(Arc::new(|path: &[AnyCodingKey]| {
        let last = path.last().map(|key| key.string_value()).unwrap_or_default();
        AnyCodingKey::new(format!("{}_{}", path.len(), last))
    }));
    let mut outer = std::collections::BTreeMap::new();
    outer.insert("inner".to_string(), profile());
    let json = JsonEncoder::new()
        .key_encoding_strategy(depth_prefix)
        .encode_to_string(&outer)
        .unwrap();
    assert_eq!(json, r#"{"1_inner":{"2_createdAt":1815,"2_userName":"ada"}}"#);

    let strip_prefix = KeyDecodingStrategy::Custom(Arc::new(|path: &[AnyCodingKey]| {
        let last = path.last().map(|key| key.string_value()).unwrap_or_default();
        AnyCodingKey::new(last.strip_prefix("x-").unwrap_or(last))
    }));
    let back: Profile = JsonDecoder::new()
        .key_decoding_strategy(strip_prefix)
        .decode_str(r#"{"x-userName": "ada", "x-createdAt": 1815}"#)
        .unwrap();
    assert_eq!(back, profile());
}

coding_keys! {
    enum ReadingKeys {
        Score = "score",
    }
}

#[derive(Debug)]
struct Reading(f64);

impl Encodable for Reading {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        encoder
            .container::<ReadingKeys>()
            .encode_f64(self.0, ReadingKeys::Score)
    }
}

impl Decodable for Reading {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
        decoder
            .container::<ReadingKeys>()?
            .decode_f64(ReadingKeys::Score)
            .map(Reading)
    }
}

fn sentinel_strategies() -> (
    NonConformingFloatEncodingStrategy,
    NonConformingFloatDecodingStrategy,
) {
    (
        NonConformingFloatEncodingStrategy::ConvertToString {
            positive_infinity: "+Infinity".to_string(),
            negative_infinity: "-Infinity".to_string(),
            nan: "NaN".to_string(),
        },
        NonConformingFloatDecodingStrategy::ConvertFromString {
            positive_infinity: "+Infinity".to_string(),
            negative_infinity: "-Infinity".to_string(),
            nan: "NaN".to_string(),
        },
    )
}

#[test]
fn test_non_finite_floats_throw_by_default() {
    let error = JsonEncoder::new()
        .encode_to_string(&Reading(f64::NAN))
        .unwrap_err();
    let EncodingError::InvalidValue { context, .. } = &error;
    assert_eq!(context.coding_path.to_string(), "score");
    assert!(context.debug_description.contains("ConvertToString"));

    let error = JsonDecoder::new()
        .decode_str::<Reading>(r#"{"score": "NaN"}"#)
        .unwrap_err();
    assert!(matches!(error, DecodingError::TypeMismatch { .. }));
}

#[test]
fn test_non_finite_float_sentinels() {
    let (encoding, decoding) = sentinel_strategies();
    let encoder = JsonEncoder::new().non_conforming_float_encoding_strategy(encoding);
    let decoder = JsonDecoder::new().non_conforming_float_decoding_strategy(decoding);

    let json = encoder.encode_to_string(&Reading(f64::NAN)).unwrap();
    assert_eq!(json, r#"{"score":"NaN"}"#);
    assert!(decoder.decode_str::<Reading>(&json).unwrap().0.is_nan());

    let json = encoder
        .encode_to_string(&vec![f64::INFINITY, f64::NEG_INFINITY, 1.5])
        .unwrap();
    assert_eq!(json, r#"["+Infinity","-Infinity",1.5]"#);
    let back: Vec<f32> = decoder.decode_str(&json).unwrap();
    assert_eq!(back, vec![f32::INFINITY, f32::NEG_INFINITY, 1.5]);

    // other strings are still mismatches
    assert!(decoder.decode_str::<Reading>(r#"{"score": "inf"}"#).is_err());
}

struct Distance(f64);

fn units_key() -> CodingUserInfoKey {
    CodingUserInfoKey::new("units")
}

impl Encodable for Distance {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        let miles = encoder.user_info().get::<&'static str>(&units_key()) == Some(&"miles");
        let value = if miles { self.0 / 1.609344 } else { self.0 };
        encoder.single_value_container().encode_f64(value.round())
    }
}

impl Decodable for Distance {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
        let miles = decoder.user_info().get::<&'static str>(&units_key()) == Some(&"miles");
        let value = decoder.single_value_container()?.decode_f64()?;
        Ok(Distance(if miles { value * 1.609344 } else { value }))
    }
}

#[test]
fn test_user_info_reaches_nested_values() {
    let info = UserInfo::new().with(units_key(), "miles");
    let trip = vec![Distance(1609.344), Distance(16.09344)];

    let plain = JsonEncoder::new().encode_to_string(&trip).unwrap();
    assert_eq!(plain, "[1609.0,16.0]");

    let converted = JsonEncoder::new()
        .user_info(info.clone())
        .encode_to_string(&trip)
        .unwrap();
    assert_eq!(converted, "[1000.0,10.0]");

    let back: Vec<Distance> = JsonDecoder::new()
        .user_info(info)
        .decode_str("[1000, 10]")
        .unwrap();
    assert!((back[0].0 - 1609.344).abs() < 1e-9);
}

#[test]
fn test_pretty_output() {
    let json = JsonEncoder::new()
        .output_formatting(OutputFormatting::Pretty)
        .encode_to_string(&profile())
        .unwrap();
    assert_eq!(json, "{\n  \"createdAt\": 1815,\n  \"userName\": \"ada\"\n}");

    let bytes = JsonEncoder::new().encode(&profile()).unwrap();
    assert_eq!(bytes, br#"{"createdAt":1815,"userName":"ada"}"#);
}

#[test]
fn test_invalid_text_is_data_corrupted() {
    let error = JsonDecoder::new().decode_str::<Profile>("{\"userName\": ").unwrap_err();
    let DecodingError::DataCorrupted(context) = &error else {
        panic!("expected data corrupted, got {error}");
    };
    assert_eq!(context.debug_description, "The given data was not valid JSON.");
    assert!(context.underlying_error.is_some());
}
