// Copyright 2026 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Round trips and edge cases for the built-in optional, sequence, set and map
// conformances.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use codable_tree::{DecodingError, Value, from_str, from_value, to_string, to_value};
use proptest::prelude::*;

#[test]
fn test_pair_encoded_map() {
    let mut map = BTreeMap::new();
    map.insert(true, 1);
    map.insert(false, 2);
    let json = to_string(&map).unwrap();
    assert_eq!(json, "[false,2,true,1]");

    // order of pairs does not matter
    let back: BTreeMap<bool, i32> = from_str("[true, 1, false, 2]").unwrap();
    assert_eq!(back, map);
}

#[test]
fn test_odd_length_pair_sequence_is_corrupted() {
    let error = from_str::<BTreeMap<bool, i32>>("[true, 1, false]").unwrap_err();
    let DecodingError::DataCorrupted(context) = &error else {
        panic!("expected data corrupted, got {error}");
    };
    assert_eq!(
        context.debug_description,
        "Expected collection of key-value pairs; encountered odd-length array instead."
    );
    assert!(context.coding_path.is_empty());
}

#[test]
fn test_pair_map_keys_can_be_tuples() {
    let mut map = HashMap::new();
    map.insert((1u8, 'a'), vec![1.5f32]);
    let json = to_string(&map).unwrap();
    assert_eq!(json, r#"[[1,"a"],[1.5]]"#);
    let back: HashMap<(u8, char), Vec<f32>> = from_str(&json).unwrap();
    assert_eq!(back, map);
}

#[test]
fn test_empty_collections() {
    assert_eq!(to_string(&Vec::<u8>::new()).unwrap(), "[]");
    assert_eq!(to_string(&BTreeMap::<String, u8>::new()).unwrap(), "{}");
    assert_eq!(to_string(&BTreeMap::<bool, u8>::new()).unwrap(), "[]");
    assert_eq!(to_string(&None::<u8>).unwrap(), "null");
    assert!(from_str::<Vec<u8>>("[]").unwrap().is_empty());
}

#[test]
fn test_sequence_shape_errors() {
    let error = from_str::<Vec<u8>>(r#"{"a": 1}"#).unwrap_err();
    assert!(matches!(error, DecodingError::TypeMismatch { .. }));

    let error = from_str::<Vec<u8>>("null").unwrap_err();
    assert!(matches!(error, DecodingError::ValueNotFound { .. }));

    let error = from_str::<HashSet<u8>>("[1, 2, 300]").unwrap_err();
    assert!(matches!(error, DecodingError::DataCorrupted(_)));
    assert_eq!(error.coding_path().to_string(), "[2]");
}

#[test]
fn test_value_embeds_in_records() {
    let value: Value = serde_json::from_str(r#"{"a": 1, "b": [true, null, "x"]}"#).unwrap();
    let mut outer = BTreeMap::new();
    outer.insert("payload".to_string(), value.clone());
    let tree = to_value(&outer).unwrap();
    assert_eq!(tree.get("payload"), Some(&value));
}

#[test]
fn test_large_unsigned_values() {
    let json = to_string(&vec![u64::MAX, 0]).unwrap();
    assert_eq!(json, format!("[{},0]", u64::MAX));
    let back: Vec<u64> = from_str(&json).unwrap();
    assert_eq!(back, vec![u64::MAX, 0]);
    assert!(from_str::<Vec<i64>>(&json).is_err());
}

#[test]
fn test_extreme_f32_round_trip() {
    for value in [f32::MAX, f32::MIN, f32::MIN_POSITIVE, f32::EPSILON, 0.1] {
        let json = to_string(&value).unwrap();
        assert_eq!(from_str::<f32>(&json).unwrap(), value, "decoding {json}");
    }
    let json = to_string(&vec![f32::MAX, -f32::MAX]).unwrap();
    assert_eq!(from_str::<Vec<f32>>(&json).unwrap(), vec![f32::MAX, -f32::MAX]);
}

proptest! {
    #[test]
    fn prop_f32_round_trip(value in any::<f32>().prop_filter("finite", |v| v.is_finite())) {
        let back: f32 = from_str(&to_string(&value).unwrap()).unwrap();
        prop_assert_eq!(back, value);
    }

    #[test]
    fn prop_f64_round_trip(values in prop::collection::vec(
        any::<f64>().prop_filter("finite", |v| v.is_finite()),
        0..8,
    )) {
        let back: Vec<f64> = from_value(&to_value(&values).unwrap()).unwrap();
        prop_assert_eq!(back, values);
    }

    #[test]
    fn prop_optional_list_round_trip(values in prop::collection::vec(prop::option::of(any::<i64>()), 0..16)) {
        let json = to_string(&values).unwrap();
        let back: Vec<Option<i64>> = from_str(&json).unwrap();
        prop_assert_eq!(back, values);
    }

    #[test]
    fn prop_sets_round_trip(
        ordered in prop::collection::btree_set(any::<i16>(), 0..16),
        hashed in prop::collection::hash_set(any::<u32>(), 0..16),
    ) {
        let back: BTreeSet<i16> = from_str(&to_string(&ordered).unwrap()).unwrap();
        prop_assert_eq!(back, ordered);
        let back: HashSet<u32> = from_str(&to_string(&hashed).unwrap()).unwrap();
        prop_assert_eq!(back, hashed);
    }

    #[test]
    fn prop_string_keyed_map_round_trip(map in prop::collection::hash_map("\\PC{0,12}", any::<String>(), 0..8)) {
        let back: HashMap<String, String> = from_str(&to_string(&map).unwrap()).unwrap();
        prop_assert_eq!(back, map);
    }

    #[test]
    fn prop_integer_keyed_map_round_trip(map in prop::collection::btree_map(any::<i32>(), any::<bool>(), 0..8)) {
        let back: BTreeMap<i32, bool> = from_str(&to_string(&map).unwrap()).unwrap();
        prop_assert_eq!(back, map);
    }

    #[test]
    fn prop_pair_map_round_trip(map in prop::collection::btree_map((any::<u8>(), any::<bool>()), any::<u64>(), 0..8)) {
        let back: BTreeMap<(u8, bool), u64> = from_str(&to_string(&map).unwrap()).unwrap();
        prop_assert_eq!(back, map);
    }

    #[test]
    fn prop_nested_round_trip(
        nested in prop::collection::vec(
            prop::collection::btree_map("[a-z]{1,6}", prop::collection::vec_deque(prop::option::of(any::<bool>()), 0..4), 0..4),
            0..4,
        )
    ) {
        let tree = to_value(&nested).unwrap();
        let back: Vec<BTreeMap<String, VecDeque<Option<bool>>>> = from_value(&tree).unwrap();
        prop_assert_eq!(back, nested);
    }
}
