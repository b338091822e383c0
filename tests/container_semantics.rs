// Copyright 2026 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Behaviour of keyed, unkeyed and single-value containers as seen from user
// `encode` / `decode` implementations.

use codable_tree::{
    AnyCodingKey, CodingKey, Decodable, Decoder, DecoderExt, DecodingError, Encodable, Encoder,
    EncoderExt, EncodingError, coding_keys, from_str, to_string,
};

coding_keys! {
    enum RecordKeys {
        A = "a",
        B = "b",
    }
}

/// Serialized as `{"a": <a>, "b": [<flag>, <note or null>, <label>]}`.
#[derive(Debug, PartialEq)]
struct Record {
    a: i64,
    flag: bool,
    note: Option<String>,
    label: String,
}

impl Encodable for Record {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        let mut container = encoder.container::<RecordKeys>();
        container.encode_i64(self.a, RecordKeys::A)?;
        let mut list = container.nested_unkeyed_container(RecordKeys::B);
        list.encode_bool(self.flag)?;
        list.encode_if_present(&self.note)?;
        list.encode_str(&self.label)
    }
}

impl Decodable for Record {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
        let container = decoder.container::<RecordKeys>()?;
        let a = container.decode_i64(RecordKeys::A)?;
        let mut list = container.nested_unkeyed_container(RecordKeys::B)?;
        Ok(Record {
            a,
            flag: list.decode_bool()?,
            note: list.decode_if_present()?,
            label: list.decode_string()?,
        })
    }
}

#[test]
fn test_record_with_heterogeneous_list() {
    let record = Record {
        a: 1,
        flag: true,
        note: None,
        label: "x".to_string(),
    };
    let json = to_string(&record).unwrap();
    assert_eq!(json, r#"{"a":1,"b":[true,null,"x"]}"#);

    let decoded: Record = from_str(r#"{"a": 1, "b": [true, null, "x"]}"#).unwrap();
    assert_eq!(decoded, record);

    let with_note: Record = from_str(r#"{"a": 2, "b": [false, "n", "y"]}"#).unwrap();
    assert_eq!(with_note.note.as_deref(), Some("n"));
}

#[test]
fn test_missing_field_reports_its_key() {
    let error = from_str::<Record>(r#"{"b": [true, null, "x"]}"#).unwrap_err();
    let DecodingError::KeyNotFound { key, context } = &error else {
        panic!("expected key not found, got {error}");
    };
    assert_eq!(key.string_value(), "a");
    assert_eq!(context.coding_path.string_values(), vec!["a"]);
}

#[test]
fn test_nested_errors_carry_full_path() {
    let error = from_str::<Record>(r#"{"a": 1, "b": [true, null, 5]}"#).unwrap_err();
    assert!(matches!(error, DecodingError::TypeMismatch { .. }));
    assert_eq!(error.coding_path().to_string(), "b[2]");

    // the absent note is not consumed, so the label is read at index 1
    let error = from_str::<Record>(r#"{"a": 1, "b": [true]}"#).unwrap_err();
    assert!(matches!(error, DecodingError::ValueNotFound { .. }));
    assert_eq!(error.coding_path().to_string(), "b[1]");
}

coding_keys! {
    enum ValueKeys {
        Value = "value",
    }
}

#[derive(Debug, PartialEq)]
struct Required(i32);

impl Decodable for Required {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
        let container = decoder.container::<ValueKeys>()?;
        container.decode(ValueKeys::Value).map(Required)
    }
}

#[derive(Debug, PartialEq)]
struct Optional(Option<i32>);

impl Decodable for Optional {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
        let container = decoder.container::<ValueKeys>()?;
        container.decode_if_present(ValueKeys::Value).map(Optional)
    }
}

#[test]
fn test_keyed_missing_null_and_malformed_are_distinct() {
    assert!(matches!(
        from_str::<Required>("{}"),
        Err(DecodingError::KeyNotFound { .. })
    ));
    assert!(matches!(
        from_str::<Required>(r#"{"value": null}"#),
        Err(DecodingError::ValueNotFound { .. })
    ));
    assert!(matches!(
        from_str::<Required>(r#"{"value": "x"}"#),
        Err(DecodingError::TypeMismatch { .. })
    ));
    assert_eq!(from_str::<Required>(r#"{"value": 3}"#).unwrap(), Required(3));

    assert_eq!(from_str::<Optional>("{}").unwrap(), Optional(None));
    assert_eq!(from_str::<Optional>(r#"{"value": null}"#).unwrap(), Optional(None));
    assert_eq!(from_str::<Optional>(r#"{"value": 4}"#).unwrap(), Optional(Some(4)));

    // present with the wrong shape is still an error
    let error = from_str::<Optional>(r#"{"value": [1]}"#).unwrap_err();
    assert!(matches!(error, DecodingError::TypeMismatch { .. }));
    assert_eq!(error.coding_path().to_string(), "value");
}

#[test]
fn test_all_keys_filtered_by_key_type() {
    struct Keys(Vec<ValueKeys>, bool);

    impl Decodable for Keys {
        fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
            let container = decoder.container::<ValueKeys>()?;
            Ok(Keys(container.all_keys(), container.contains(&ValueKeys::Value)))
        }
    }

    let keys: Keys = from_str(r#"{"other": 1, "value": null}"#).unwrap();
    assert_eq!(keys.0, vec![ValueKeys::Value]);
    assert!(keys.1);
}

/// Records cursor positions while walking a list.
struct CursorTrace(Vec<(usize, bool)>);

impl Decodable for CursorTrace {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
        let mut container = decoder.unkeyed_container()?;
        let mut trace = vec![(container.current_index(), container.is_at_end())];

        // failed decode: no movement
        assert!(container.decode_string().is_err());
        trace.push((container.current_index(), container.is_at_end()));

        // non-null nil check: no movement
        assert!(!container.decode_nil()?);
        trace.push((container.current_index(), container.is_at_end()));

        container.decode_i32()?;
        trace.push((container.current_index(), container.is_at_end()));

        // null nil check: consumes the slot
        assert!(container.decode_nil()?);
        trace.push((container.current_index(), container.is_at_end()));

        assert_eq!(container.decode_if_present::<i32>()?, None);
        trace.push((container.current_index(), container.is_at_end()));
        Ok(CursorTrace(trace))
    }
}

#[test]
fn test_unkeyed_cursor_discipline() {
    let trace: CursorTrace = from_str("[7, null]").unwrap();
    assert_eq!(
        trace.0,
        vec![
            (0, false),
            (0, false),
            (0, false),
            (1, false),
            (2, true),
            (2, true),
        ]
    );
}

struct PathKeeper;

impl Decodable for PathKeeper {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
        let before = decoder.coding_path();
        assert_eq!(before.string_values(), vec!["inner"]);

        let container = decoder.container::<AnyCodingKey>()?;
        let error = container
            .decode::<Vec<i32>>(AnyCodingKey::new("items"))
            .unwrap_err();
        assert_eq!(error.coding_path().to_string(), "inner.items[0]");
        assert_eq!(decoder.coding_path(), before);

        let items: Vec<String> = container.decode(AnyCodingKey::new("items"))?;
        assert_eq!(items.len(), 2);
        assert_eq!(decoder.coding_path(), before);
        Ok(PathKeeper)
    }
}

struct Wrapper;

impl Decodable for Wrapper {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
        let container = decoder.container::<AnyCodingKey>()?;
        container.decode::<PathKeeper>(AnyCodingKey::new("inner"))?;
        assert!(decoder.coding_path().is_empty());
        Ok(Wrapper)
    }
}

#[test]
fn test_decoding_restores_coding_path() {
    from_str::<Wrapper>(r#"{"inner": {"items": ["1", "x"]}}"#).unwrap();
}

struct EncodePathKeeper;

impl Encodable for EncodePathKeeper {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        let before = encoder.coding_path();
        let mut container = encoder.container::<AnyCodingKey>();

        let error = container
            .encode(&vec![1.0, f64::NAN], AnyCodingKey::new("bad"))
            .unwrap_err();
        assert_eq!(error.coding_path().to_string(), "inner.bad[1]");
        assert_eq!(encoder.coding_path(), before);

        container.encode(&1, AnyCodingKey::new("ok"))?;
        assert_eq!(encoder.coding_path(), before);
        Ok(())
    }
}

#[test]
fn test_encoding_restores_coding_path() {
    struct Outer;
    impl Encodable for Outer {
        fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
            let mut container = encoder.container::<AnyCodingKey>();
            container.encode(&EncodePathKeeper, AnyCodingKey::new("inner"))
        }
    }
    // the failed entry leaves nothing behind
    assert_eq!(to_string(&Outer).unwrap(), r#"{"inner":{"ok":1}}"#);
}

#[test]
fn test_same_kind_container_requests_merge() {
    struct Twice;
    impl Encodable for Twice {
        fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
            encoder
                .container::<AnyCodingKey>()
                .encode_i32(1, AnyCodingKey::new("x"))?;
            encoder
                .container::<AnyCodingKey>()
                .encode_i32(2, AnyCodingKey::new("y"))
        }
    }
    assert_eq!(to_string(&Twice).unwrap(), r#"{"x":1,"y":2}"#);
}

#[test]
#[should_panic(expected = "Attempt to push new unkeyed encoding container")]
fn test_second_top_level_container_kind_panics() {
    struct Confused;
    impl Encodable for Confused {
        fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
            encoder.container::<AnyCodingKey>().encode_nil(AnyCodingKey::new("x"))?;
            encoder.unkeyed_container().encode_nil()
        }
    }
    let _ = to_string(&Confused);
}

#[test]
#[should_panic(expected = "single value container")]
fn test_second_single_value_write_panics() {
    struct Double;
    impl Encodable for Double {
        fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
            let mut container = encoder.single_value_container();
            container.encode_str("first")?;
            container.encode(&"second".to_string())
        }
    }
    let _ = to_string(&Double);
}

#[test]
fn test_single_value_decode_does_not_consume() {
    struct Peek(bool, Option<u8>);
    impl Decodable for Peek {
        fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
            let container = decoder.single_value_container()?;
            let is_nil = container.decode_nil();
            let again = container.decode_nil();
            assert_eq!(is_nil, again);
            Ok(Peek(is_nil, container.decode()?))
        }
    }
    let null: Peek = from_str("null").unwrap();
    assert!(null.0);
    assert_eq!(null.1, None);

    let number: Peek = from_str("9").unwrap();
    assert!(!number.0);
    assert_eq!(number.1, Some(9));
}

#[test]
fn test_unkeyed_count_tracks_appends() {
    struct Counted;
    impl Encodable for Counted {
        fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
            let mut list = encoder.unkeyed_container();
            assert_eq!(list.count(), 0);
            list.encode_u8(1)?;
            assert_eq!(list.count(), 1);

            // a failed element is not appended
            assert!(list.encode(&f64::NAN).is_err());
            assert_eq!(list.count(), 1);

            list.nested_container::<AnyCodingKey>()
                .encode_bool(true, AnyCodingKey::new("k"))?;
            assert_eq!(list.count(), 2);
            list.nested_unkeyed_container().encode_nil()?;
            assert_eq!(list.count(), 3);

            drop(list.super_encoder());
            assert_eq!(list.count(), 4);
            Ok(())
        }
    }
    assert_eq!(to_string(&Counted).unwrap(), r#"[1,{"k":true},[null],{}]"#);
}

#[test]
fn test_keyed_decode_nil_requires_the_key() {
    #[derive(Debug)]
    struct NilCheck(bool);
    impl Decodable for NilCheck {
        fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
            let container = decoder.container::<ValueKeys>()?;
            container.decode_nil(ValueKeys::Value).map(NilCheck)
        }
    }

    assert!(from_str::<NilCheck>(r#"{"value": null}"#).unwrap().0);
    assert!(!from_str::<NilCheck>(r#"{"value": 0}"#).unwrap().0);

    let error = from_str::<NilCheck>("{}").unwrap_err();
    let DecodingError::KeyNotFound { key, context } = &error else {
        panic!("expected key not found, got {error}");
    };
    assert_eq!(key.string_value(), "value");
    assert_eq!(context.coding_path.to_string(), "value");
}

#[test]
fn test_missing_key_message_names_the_key_type() {
    let error = from_str::<Record>(r#"{"b": [true, null, "x"]}"#).unwrap_err();
    assert_eq!(
        error.context().debug_description,
        r#"No value associated with key RecordKeys(stringValue: "a", intValue: nil) ("a")."#
    );

    // a missing key deeper down keeps its own key type
    #[derive(Debug)]
    struct Holder;
    impl Decodable for Holder {
        fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
            let container = decoder.container::<AnyCodingKey>()?;
            container.decode::<Required>(AnyCodingKey::new("inner"))?;
            Ok(Holder)
        }
    }
    let error = from_str::<Holder>(r#"{"inner": {}}"#).unwrap_err();
    assert_eq!(
        error.context().debug_description,
        r#"No value associated with key ValueKeys(stringValue: "value", intValue: nil) ("value")."#
    );
    assert_eq!(error.coding_path().to_string(), "inner.value");
}
