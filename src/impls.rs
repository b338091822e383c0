//! Conformances for standard library types, `half::f16` and [`Value`].
//!
//! Everything here is written purely against the container API, so it works
//! with any format:
//!
//! * scalars use a single-value container,
//! * `Option` is a single-value container plus a nil check,
//! * sequences, sets and tuples use an unkeyed container, read until
//!   `is_at_end`,
//! * maps use a keyed container when their key type has a string form (see
//!   [`MapKey`]) and otherwise an unkeyed container of alternating keys and
//!   values.

use std::any::type_name;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::{BuildHasher, Hash};
use std::rc::Rc;
use std::sync::Arc;

use half::f16;

use crate::decode::{Decodable, Decoder, DecoderExt};
use crate::encode::{Encodable, Encoder, EncoderExt};
use crate::error::{Context, DecodingError, EncodingError};
use crate::key::{AnyCodingKey, CodingKey};
use crate::value::Value;

macro_rules! primitive_codable {
    ($($ty:ty => $encode:ident, $decode:ident;)*) => {$(
        impl Encodable for $ty {
            fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
                encoder.single_value_container().$encode(*self)
            }
        }

        impl Decodable for $ty {
            fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
                decoder.single_value_container()?.$decode()
            }
        }
    )*};
}

primitive_codable! {
    bool => encode_bool, decode_bool;
    i8 => encode_i8, decode_i8;
    i16 => encode_i16, decode_i16;
    i32 => encode_i32, decode_i32;
    i64 => encode_i64, decode_i64;
    u8 => encode_u8, decode_u8;
    u16 => encode_u16, decode_u16;
    u32 => encode_u32, decode_u32;
    u64 => encode_u64, decode_u64;
    f32 => encode_f32, decode_f32;
    f64 => encode_f64, decode_f64;
}

impl Encodable for usize {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        encoder.single_value_container().encode_u64(*self as u64)
    }
}

impl Decodable for usize {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
        let container = decoder.single_value_container()?;
        let value = container.decode_u64()?;
        usize::try_from(value).map_err(|_| {
            container.data_corrupted_error(format!(
                "Parsed JSON number <{value}> does not fit in usize."
            ))
        })
    }
}

impl Encodable for isize {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        encoder.single_value_container().encode_i64(*self as i64)
    }
}

impl Decodable for isize {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
        let container = decoder.single_value_container()?;
        let value = container.decode_i64()?;
        isize::try_from(value).map_err(|_| {
            container.data_corrupted_error(format!(
                "Parsed JSON number <{value}> does not fit in isize."
            ))
        })
    }
}

impl Encodable for f16 {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        encoder.single_value_container().encode_f32(self.to_f32())
    }
}

impl Decodable for f16 {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
        let container = decoder.single_value_container()?;
        let value = container.decode_f32()?;
        if value.is_finite() && value.abs() > f16::MAX.to_f32() {
            return Err(container.data_corrupted_error(format!(
                "Parsed JSON number <{value}> does not fit in f16."
            )));
        }
        Ok(f16::from_f32(value))
    }
}

impl Encodable for str {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        encoder.single_value_container().encode_str(self)
    }
}

impl Encodable for String {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        encoder.single_value_container().encode_str(self)
    }
}

impl Decodable for String {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
        decoder.single_value_container()?.decode_string()
    }
}

impl Encodable for char {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        let mut buffer = [0; 4];
        encoder
            .single_value_container()
            .encode_str(self.encode_utf8(&mut buffer))
    }
}

impl Decodable for char {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
        let container = decoder.single_value_container()?;
        let text = container.decode_string()?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(single), None) => Ok(single),
            _ => Err(container.data_corrupted_error(format!(
                "Expected a single character but found \"{text}\" instead."
            ))),
        }
    }
}

impl<T: Encodable + ?Sized> Encodable for &T {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        (**self).encode(encoder)
    }
}

macro_rules! pointer_codable {
    ($($pointer:ident),*) => {$(
        impl<T: Encodable + ?Sized> Encodable for $pointer<T> {
            fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
                (**self).encode(encoder)
            }
        }

        impl<T: Decodable> Decodable for $pointer<T> {
            fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
                T::decode(decoder).map($pointer::new)
            }
        }
    )*};
}

pointer_codable!(Box, Rc, Arc);

impl<T: Encodable> Encodable for Option<T> {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        match self {
            Some(value) => value.encode(encoder),
            None => encoder.single_value_container().encode_nil(),
        }
    }
}

impl<T: Decodable> Decodable for Option<T> {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
        let container = decoder.single_value_container()?;
        if container.decode_nil() {
            return Ok(None);
        }
        container.decode().map(Some)
    }
}

fn encode_sequence<'a, T, I>(encoder: &mut dyn Encoder, items: I) -> Result<(), EncodingError>
where
    T: Encodable + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut container = encoder.unkeyed_container();
    container.encode_contents_of(items)
}

/// Reads elements until the container is exhausted.
fn decode_sequence<T, C>(decoder: &mut dyn Decoder) -> Result<C, DecodingError>
where
    T: Decodable,
    C: Default + Extend<T>,
{
    let mut container = decoder.unkeyed_container()?;
    let mut collection = C::default();
    while !container.is_at_end() {
        let element = container.decode::<T>()?;
        collection.extend(Some(element));
    }
    Ok(collection)
}

impl<T: Encodable> Encodable for [T] {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        encode_sequence(encoder, self)
    }
}

impl<T: Encodable, const N: usize> Encodable for [T; N] {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        encode_sequence(encoder, self)
    }
}

impl<T: Encodable> Encodable for Vec<T> {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        encode_sequence(encoder, self)
    }
}

impl<T: Decodable> Decodable for Vec<T> {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
        decode_sequence(decoder)
    }
}

impl<T: Encodable> Encodable for VecDeque<T> {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        encode_sequence(encoder, self)
    }
}

impl<T: Decodable> Decodable for VecDeque<T> {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
        decode_sequence(decoder)
    }
}

impl<T: Encodable, S> Encodable for HashSet<T, S> {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        encode_sequence(encoder, self)
    }
}

impl<T, S> Decodable for HashSet<T, S>
where
    T: Decodable + Eq + Hash,
    S: BuildHasher + Default,
{
    fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
        decode_sequence(decoder)
    }
}

impl<T: Encodable> Encodable for BTreeSet<T> {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        encode_sequence(encoder, self)
    }
}

impl<T: Decodable + Ord> Decodable for BTreeSet<T> {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
        decode_sequence(decoder)
    }
}

macro_rules! tuple_codable {
    ($(($($name:ident : $index:tt),+))*) => {$(
        impl<$($name: Encodable),+> Encodable for ($($name,)+) {
            fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
                let mut container = encoder.unkeyed_container();
                $(container.encode(&self.$index)?;)+
                Ok(())
            }
        }

        impl<$($name: Decodable),+> Decodable for ($($name,)+) {
            fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
                let mut container = decoder.unkeyed_container()?;
                Ok(($(container.decode::<$name>()?,)+))
            }
        }
    )*};
}

tuple_codable! {
    (A: 0, B: 1)
    (A: 0, B: 1, C: 2)
    (A: 0, B: 1, C: 2, D: 3)
}

/// A type usable as a map key.
///
/// Maps whose key type is keyed (strings and integers) are written as keyed
/// containers, integers under their decimal string. Every other key type is
/// written as an unkeyed container of alternating keys and values.
pub trait MapKey: Encodable + Decodable {
    /// Whether maps over this key type use a keyed container.
    fn is_keyed() -> bool {
        false
    }

    /// The container key for this value; `None` for non-keyed types.
    fn to_coding_key(&self) -> Option<AnyCodingKey> {
        None
    }

    /// Parses a container key back, or `None` if it is not a valid key.
    fn from_coding_key(_key: &AnyCodingKey) -> Option<Self> {
        None
    }
}

impl MapKey for String {
    fn is_keyed() -> bool {
        true
    }

    fn to_coding_key(&self) -> Option<AnyCodingKey> {
        Some(AnyCodingKey::new(self.as_str()))
    }

    fn from_coding_key(key: &AnyCodingKey) -> Option<Self> {
        Some(key.string_value().to_owned())
    }
}

macro_rules! integer_map_key {
    ($($ty:ty),*) => {$(
        impl MapKey for $ty {
            fn is_keyed() -> bool {
                true
            }

            fn to_coding_key(&self) -> Option<AnyCodingKey> {
                Some(match i64::try_from(*self) {
                    Ok(int) => AnyCodingKey::from_int(int),
                    Err(_) => AnyCodingKey::new(self.to_string()),
                })
            }

            fn from_coding_key(key: &AnyCodingKey) -> Option<Self> {
                key.string_value().parse().ok()
            }
        }
    )*};
}

integer_map_key!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl MapKey for bool {}
impl MapKey for char {}
impl<A: Encodable + Decodable, B: Encodable + Decodable> MapKey for (A, B) {}

fn encode_map<'a, K, V, I>(encoder: &mut dyn Encoder, entries: I) -> Result<(), EncodingError>
where
    K: MapKey + 'a,
    V: Encodable + 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
{
    if !K::is_keyed() {
        let mut container = encoder.unkeyed_container();
        for (key, value) in entries {
            container.encode(key)?;
            container.encode(value)?;
        }
        return Ok(());
    }

    let mut container = encoder.container::<AnyCodingKey>();
    for (key, value) in entries {
        let Some(coding_key) = key.to_coding_key() else {
            return Err(EncodingError::invalid_value(
                type_name::<K>(),
                Context::new(
                    container.coding_path(),
                    format!("Map key of type {} has no string form.", type_name::<K>()),
                ),
            ));
        };
        container.encode(value, coding_key)?;
    }
    Ok(())
}

fn decode_map<K, V, M>(decoder: &mut dyn Decoder) -> Result<M, DecodingError>
where
    K: MapKey,
    V: Decodable,
    M: Default + Extend<(K, V)>,
{
    let mut map = M::default();

    if !K::is_keyed() {
        let mut container = decoder.unkeyed_container()?;
        if container.count().is_some_and(|count| count % 2 != 0) {
            return Err(container.data_corrupted_error(
                "Expected collection of key-value pairs; encountered odd-length array instead.",
            ));
        }
        while !container.is_at_end() {
            let key = container.decode::<K>()?;
            if container.is_at_end() {
                return Err(container.data_corrupted_error(
                    "Unkeyed container reached end before value in key-value pair.",
                ));
            }
            let value = container.decode::<V>()?;
            map.extend(Some((key, value)));
        }
        return Ok(map);
    }

    let container = decoder.container::<AnyCodingKey>()?;
    for coding_key in container.all_keys() {
        let Some(key) = K::from_coding_key(&coding_key) else {
            return Err(container.data_corrupted_error(
                &coding_key,
                format!(
                    "Expected {} key but found \"{}\" instead.",
                    type_name::<K>(),
                    coding_key.string_value()
                ),
            ));
        };
        let value = container.decode::<V>(coding_key)?;
        map.extend(Some((key, value)));
    }
    Ok(map)
}

impl<K: MapKey, V: Encodable, S> Encodable for HashMap<K, V, S> {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        encode_map(encoder, self)
    }
}

impl<K, V, S> Decodable for HashMap<K, V, S>
where
    K: MapKey + Eq + Hash,
    V: Decodable,
    S: BuildHasher + Default,
{
    fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
        decode_map(decoder)
    }
}

impl<K: MapKey, V: Encodable> Encodable for BTreeMap<K, V> {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        encode_map(encoder, self)
    }
}

impl<K: MapKey + Ord, V: Decodable> Decodable for BTreeMap<K, V> {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
        decode_map(decoder)
    }
}

impl Encodable for Value {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
        match self {
            Value::Null => encoder.single_value_container().encode_nil(),
            Value::Bool(value) => encoder.single_value_container().encode_bool(*value),
            Value::Integer(value) => encoder.single_value_container().encode_i64(*value),
            Value::Unsigned(value) => encoder.single_value_container().encode_u64(*value),
            Value::Float(value) => encoder.single_value_container().encode_f64(*value),
            Value::String(value) => encoder.single_value_container().encode_str(value),
            Value::Array(items) => encode_sequence(encoder, items),
            Value::Object(entries) => {
                let mut container = encoder.container::<AnyCodingKey>();
                for (key, value) in entries {
                    container.encode(value, AnyCodingKey::new(key.as_str()))?;
                }
                Ok(())
            }
        }
    }
}
