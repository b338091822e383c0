//! The decoding half of the container abstraction.
//!
//! Mirrors [`encode`](crate::encode): a [`Decodable`] type asks its
//! [`Decoder`] for one top-level container and reads itself out of it. Unlike
//! encoding, container requests are fallible because the tree node at the
//! current path may not have the requested shape.
//!
//! Keyed containers are looked up by key in any order. Unkeyed containers are
//! consumed front to back through a cursor that only moves forward on success.
//!
//! # Example
//! ```
//! use codable_tree::{Decodable, Decoder, DecoderExt, DecodingError, coding_keys};
//!
//! coding_keys! {
//!     enum PointKeys {
//!         X = "x",
//!         Y = "y",
//!     }
//! }
//!
//! #[derive(Debug, PartialEq)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! impl Decodable for Point {
//!     fn decode(decoder: &mut dyn Decoder) -> Result<Self, DecodingError> {
//!         let container = decoder.container::<PointKeys>()?;
//!         Ok(Point {
//!             x: container.decode(PointKeys::X)?,
//!             y: container.decode(PointKeys::Y)?,
//!         })
//!     }
//! }
//!
//! let point: Point = codable_tree::from_str(r#"{"y": 2, "x": 1}"#).unwrap();
//! assert_eq!(point, Point { x: 1, y: 2 });
//! ```

use std::marker::PhantomData;

use crate::error::{Context, DecodingError, missing_key_description};
use crate::key::{AnyCodingKey, CodingKey, CodingPath};
use crate::user_info::UserInfo;

type Result<T> = std::result::Result<T, DecodingError>;

/// A type that can read itself out of a [`Decoder`].
pub trait Decodable: Sized {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self>;
}

/// Hands out the top-level container for the value at the current path.
pub trait Decoder {
    /// Keys from the root to the value currently being decoded.
    fn coding_path(&self) -> CodingPath;

    fn user_info(&self) -> &UserInfo;

    /// A keyed container with its key type erased; see
    /// [`DecoderExt::container`] for the typed form.
    fn keyed_container(&mut self) -> Result<KeyedDecodingContainer<AnyCodingKey>>;

    fn unkeyed_container(&mut self) -> Result<UnkeyedDecodingContainer>;

    fn single_value_container(&mut self) -> Result<SingleValueDecodingContainer>;
}

/// Generic conveniences over any [`Decoder`], including trait objects.
pub trait DecoderExt: Decoder {
    /// A keyed container addressed by `K`.
    fn container<K: CodingKey>(&mut self) -> Result<KeyedDecodingContainer<K>> {
        Ok(self.keyed_container()?.rekey())
    }
}

impl<D: Decoder + ?Sized> DecoderExt for D {}

/// A typed slot a container fills with a nested value.
///
/// Container protocols cannot have generic methods, so a nested
/// [`Decodable`] is requested by passing an `Option<T>` that the format fills
/// by running `T::decode` against a decoder positioned at the nested value.
pub trait DecodePlace {
    fn fill(&mut self, decoder: &mut dyn Decoder) -> Result<()>;

    /// Name of the type the slot expects, for error reports.
    fn type_name(&self) -> &'static str;
}

impl<T: Decodable> DecodePlace for Option<T> {
    fn fill(&mut self, decoder: &mut dyn Decoder) -> Result<()> {
        *self = Some(T::decode(decoder)?);
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

fn take_place<T>(place: Option<T>, path: impl FnOnce() -> CodingPath) -> Result<T> {
    place.ok_or_else(|| {
        DecodingError::data_corrupted(Context::new(
            path(),
            "Container returned without producing a value.",
        ))
    })
}

/// Capability set of a format's keyed decoding container over keys `K`.
///
/// Lookups do not consume anything, so every method takes `&self`.
pub trait KeyedDecodingContainerProtocol<K: CodingKey> {
    fn coding_path(&self) -> CodingPath;

    /// Every key present in the container that `K` accepts.
    fn all_keys(&self) -> Vec<K>;

    /// Whether `key` is structurally present; its value may still be null.
    fn contains(&self, key: &K) -> bool;

    /// Whether the value at `key` is null. Fails with `KeyNotFound` when absent.
    fn decode_nil(&self, key: &K) -> Result<bool>;

    fn decode_bool(&self, key: &K) -> Result<bool>;
    fn decode_i8(&self, key: &K) -> Result<i8>;
    fn decode_i16(&self, key: &K) -> Result<i16>;
    fn decode_i32(&self, key: &K) -> Result<i32>;
    fn decode_i64(&self, key: &K) -> Result<i64>;
    fn decode_u8(&self, key: &K) -> Result<u8>;
    fn decode_u16(&self, key: &K) -> Result<u16>;
    fn decode_u32(&self, key: &K) -> Result<u32>;
    fn decode_u64(&self, key: &K) -> Result<u64>;
    fn decode_f32(&self, key: &K) -> Result<f32>;
    fn decode_f64(&self, key: &K) -> Result<f64>;
    fn decode_string(&self, key: &K) -> Result<String>;

    /// Decodes the nested value at `key` into `place`, one level deeper in
    /// the coding path.
    fn decode_value(&self, key: &K, place: &mut dyn DecodePlace) -> Result<()>;

    fn nested_container(&self, key: &K) -> Result<KeyedDecodingContainer<AnyCodingKey>>;
    fn nested_unkeyed_container(&self, key: &K) -> Result<UnkeyedDecodingContainer>;

    /// A decoder over the value stored at the format's reserved super key,
    /// or over null if there is none.
    fn super_decoder(&self) -> Result<Box<dyn Decoder>>;
    fn super_decoder_for_key(&self, key: &K) -> Result<Box<dyn Decoder>>;
}

/// Capability set of a format's unkeyed decoding container.
///
/// `current_index` starts at zero and advances by one for every element
/// successfully consumed; failed reads leave it untouched.
pub trait UnkeyedDecodingContainerProtocol {
    fn coding_path(&self) -> CodingPath;

    /// Number of elements, if known up front.
    fn count(&self) -> Option<usize>;

    fn is_at_end(&self) -> bool;

    fn current_index(&self) -> usize;

    /// Consumes the element at the cursor and returns `true` if it is null;
    /// returns `false` without moving otherwise.
    fn decode_nil(&mut self) -> Result<bool>;

    fn decode_bool(&mut self) -> Result<bool>;
    fn decode_i8(&mut self) -> Result<i8>;
    fn decode_i16(&mut self) -> Result<i16>;
    fn decode_i32(&mut self) -> Result<i32>;
    fn decode_i64(&mut self) -> Result<i64>;
    fn decode_u8(&mut self) -> Result<u8>;
    fn decode_u16(&mut self) -> Result<u16>;
    fn decode_u32(&mut self) -> Result<u32>;
    fn decode_u64(&mut self) -> Result<u64>;
    fn decode_f32(&mut self) -> Result<f32>;
    fn decode_f64(&mut self) -> Result<f64>;
    fn decode_string(&mut self) -> Result<String>;
    fn decode_value(&mut self, place: &mut dyn DecodePlace) -> Result<()>;

    fn nested_container(&mut self) -> Result<KeyedDecodingContainer<AnyCodingKey>>;
    fn nested_unkeyed_container(&mut self) -> Result<UnkeyedDecodingContainer>;

    /// A decoder over the element at the cursor, consuming it.
    fn super_decoder(&mut self) -> Result<Box<dyn Decoder>>;
}

/// Capability set of a format's single-value decoding container.
pub trait SingleValueDecodingContainerProtocol {
    fn coding_path(&self) -> CodingPath;

    /// Whether the value is null. Never consumes.
    fn decode_nil(&self) -> bool;

    fn decode_bool(&self) -> Result<bool>;
    fn decode_i8(&self) -> Result<i8>;
    fn decode_i16(&self) -> Result<i16>;
    fn decode_i32(&self) -> Result<i32>;
    fn decode_i64(&self) -> Result<i64>;
    fn decode_u8(&self) -> Result<u8>;
    fn decode_u16(&self) -> Result<u16>;
    fn decode_u32(&self) -> Result<u32>;
    fn decode_u64(&self) -> Result<u64>;
    fn decode_f32(&self) -> Result<f32>;
    fn decode_f64(&self) -> Result<f64>;
    fn decode_string(&self) -> Result<String>;
    fn decode_value(&self, place: &mut dyn DecodePlace) -> Result<()>;
}

/// A keyed decoding container addressed by keys of type `K`.
pub struct KeyedDecodingContainer<K: CodingKey> {
    inner: Box<dyn KeyedDecodingContainerProtocol<K>>,
}

macro_rules! keyed_primitive_decoders {
    ($($method:ident -> $ty:ty),* $(,)?) => {$(
        pub fn $method(&self, key: K) -> Result<$ty> {
            self.inner.$method(&key)
        }
    )*};
}

impl<K: CodingKey> KeyedDecodingContainer<K> {
    pub fn new<C>(container: C) -> Self
    where
        C: KeyedDecodingContainerProtocol<K> + 'static,
    {
        KeyedDecodingContainer {
            inner: Box::new(container),
        }
    }

    pub fn coding_path(&self) -> CodingPath {
        self.inner.coding_path()
    }

    pub fn all_keys(&self) -> Vec<K> {
        self.inner.all_keys()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    pub fn decode_nil(&self, key: K) -> Result<bool> {
        self.inner.decode_nil(&key)
    }

    keyed_primitive_decoders!(
        decode_bool -> bool,
        decode_i8 -> i8,
        decode_i16 -> i16,
        decode_i32 -> i32,
        decode_i64 -> i64,
        decode_u8 -> u8,
        decode_u16 -> u16,
        decode_u32 -> u32,
        decode_u64 -> u64,
        decode_f32 -> f32,
        decode_f64 -> f64,
        decode_string -> String,
    );

    pub fn decode<T: Decodable>(&self, key: K) -> Result<T> {
        let mut place: Option<T> = None;
        self.inner.decode_value(&key, &mut place)?;
        take_place(place, || self.coding_path().appending(&key))
    }

    /// `None` when `key` is absent or null; a present value of the wrong
    /// shape is still an error.
    pub fn decode_if_present<T: Decodable>(&self, key: K) -> Result<Option<T>> {
        if !self.inner.contains(&key) || self.inner.decode_nil(&key)? {
            return Ok(None);
        }
        self.decode(key).map(Some)
    }

    pub fn nested_container<NK: CodingKey>(&self, key: K) -> Result<KeyedDecodingContainer<NK>> {
        Ok(self.inner.nested_container(&key)?.rekey())
    }

    pub fn nested_unkeyed_container(&self, key: K) -> Result<UnkeyedDecodingContainer> {
        self.inner.nested_unkeyed_container(&key)
    }

    pub fn super_decoder(&self) -> Result<Box<dyn Decoder>> {
        self.inner.super_decoder()
    }

    pub fn super_decoder_for_key(&self, key: K) -> Result<Box<dyn Decoder>> {
        self.inner.super_decoder_for_key(&key)
    }

    /// A `DataCorrupted` error attributed to `key` in this container, for
    /// use by `decode` implementations validating what they read.
    pub fn data_corrupted_error(&self, key: &K, description: impl Into<String>) -> DecodingError {
        DecodingError::data_corrupted(Context::new(
            self.coding_path().appending(key),
            description,
        ))
    }
}

impl KeyedDecodingContainer<AnyCodingKey> {
    /// Re-types an erased container for the caller's key type.
    pub fn rekey<K: CodingKey>(self) -> KeyedDecodingContainer<K> {
        KeyedDecodingContainer::new(Rekeyed {
            inner: self.inner,
            marker: PhantomData,
        })
    }
}

struct Rekeyed<K> {
    inner: Box<dyn KeyedDecodingContainerProtocol<AnyCodingKey>>,
    marker: PhantomData<fn() -> K>,
}

macro_rules! rekeyed_primitive_decoders {
    ($($method:ident -> $ty:ty),* $(,)?) => {$(
        fn $method(&self, key: &K) -> Result<$ty> {
            self.named(key, self.inner.$method(&AnyCodingKey::from_key(key)))
        }
    )*};
}

impl<K: CodingKey> Rekeyed<K> {
    /// Puts the caller's key type back into a missing-key message raised for
    /// `key` itself. Errors from deeper values pass through untouched.
    fn named<T>(&self, key: &K, result: Result<T>) -> Result<T> {
        result.map_err(|error| match error {
            DecodingError::KeyNotFound {
                key: erased,
                mut context,
            } if context.coding_path == self.inner.coding_path().appending(key) => {
                context.debug_description = missing_key_description(key);
                DecodingError::KeyNotFound {
                    key: erased,
                    context,
                }
            }
            other => other,
        })
    }
}

impl<K: CodingKey> KeyedDecodingContainerProtocol<K> for Rekeyed<K> {
    fn coding_path(&self) -> CodingPath {
        self.inner.coding_path()
    }

    fn all_keys(&self) -> Vec<K> {
        self.inner
            .all_keys()
            .iter()
            .filter_map(|key| K::from_string_value(key.string_value()))
            .collect()
    }

    fn contains(&self, key: &K) -> bool {
        self.inner.contains(&AnyCodingKey::from_key(key))
    }

    fn decode_nil(&self, key: &K) -> Result<bool> {
        self.named(key, self.inner.decode_nil(&AnyCodingKey::from_key(key)))
    }

    rekeyed_primitive_decoders!(
        decode_bool -> bool,
        decode_i8 -> i8,
        decode_i16 -> i16,
        decode_i32 -> i32,
        decode_i64 -> i64,
        decode_u8 -> u8,
        decode_u16 -> u16,
        decode_u32 -> u32,
        decode_u64 -> u64,
        decode_f32 -> f32,
        decode_f64 -> f64,
        decode_string -> String,
    );

    fn decode_value(&self, key: &K, place: &mut dyn DecodePlace) -> Result<()> {
        let result = self.inner.decode_value(&AnyCodingKey::from_key(key), place);
        self.named(key, result)
    }

    fn nested_container(&self, key: &K) -> Result<KeyedDecodingContainer<AnyCodingKey>> {
        self.named(key, self.inner.nested_container(&AnyCodingKey::from_key(key)))
    }

    fn nested_unkeyed_container(&self, key: &K) -> Result<UnkeyedDecodingContainer> {
        let result = self.inner.nested_unkeyed_container(&AnyCodingKey::from_key(key));
        self.named(key, result)
    }

    fn super_decoder(&self) -> Result<Box<dyn Decoder>> {
        self.inner.super_decoder()
    }

    fn super_decoder_for_key(&self, key: &K) -> Result<Box<dyn Decoder>> {
        self.inner.super_decoder_for_key(&AnyCodingKey::from_key(key))
    }
}

/// A sequential decoding container.
pub struct UnkeyedDecodingContainer {
    inner: Box<dyn UnkeyedDecodingContainerProtocol>,
}

macro_rules! unkeyed_primitive_decoders {
    ($($method:ident -> $ty:ty),* $(,)?) => {$(
        pub fn $method(&mut self) -> Result<$ty> {
            self.inner.$method()
        }
    )*};
}

impl UnkeyedDecodingContainer {
    pub fn new<C>(container: C) -> Self
    where
        C: UnkeyedDecodingContainerProtocol + 'static,
    {
        UnkeyedDecodingContainer {
            inner: Box::new(container),
        }
    }

    pub fn coding_path(&self) -> CodingPath {
        self.inner.coding_path()
    }

    pub fn count(&self) -> Option<usize> {
        self.inner.count()
    }

    pub fn is_at_end(&self) -> bool {
        self.inner.is_at_end()
    }

    pub fn current_index(&self) -> usize {
        self.inner.current_index()
    }

    pub fn decode_nil(&mut self) -> Result<bool> {
        self.inner.decode_nil()
    }

    unkeyed_primitive_decoders!(
        decode_bool -> bool,
        decode_i8 -> i8,
        decode_i16 -> i16,
        decode_i32 -> i32,
        decode_i64 -> i64,
        decode_u8 -> u8,
        decode_u16 -> u16,
        decode_u32 -> u32,
        decode_u64 -> u64,
        decode_f32 -> f32,
        decode_f64 -> f64,
        decode_string -> String,
    );

    pub fn decode<T: Decodable>(&mut self) -> Result<T> {
        let mut place: Option<T> = None;
        self.inner.decode_value(&mut place)?;
        take_place(place, || self.coding_path())
    }

    /// `None` at the end of the container or for a null element (which is
    /// consumed); otherwise decodes the element.
    pub fn decode_if_present<T: Decodable>(&mut self) -> Result<Option<T>> {
        if self.inner.is_at_end() || self.inner.decode_nil()? {
            return Ok(None);
        }
        self.decode().map(Some)
    }

    pub fn nested_container<K: CodingKey>(&mut self) -> Result<KeyedDecodingContainer<K>> {
        Ok(self.inner.nested_container()?.rekey())
    }

    pub fn nested_unkeyed_container(&mut self) -> Result<UnkeyedDecodingContainer> {
        self.inner.nested_unkeyed_container()
    }

    pub fn super_decoder(&mut self) -> Result<Box<dyn Decoder>> {
        self.inner.super_decoder()
    }

    /// A `DataCorrupted` error attributed to this container's path.
    pub fn data_corrupted_error(&self, description: impl Into<String>) -> DecodingError {
        DecodingError::data_corrupted(Context::new(self.coding_path(), description))
    }
}

/// A container over exactly one value.
pub struct SingleValueDecodingContainer {
    inner: Box<dyn SingleValueDecodingContainerProtocol>,
}

macro_rules! single_primitive_decoders {
    ($($method:ident -> $ty:ty),* $(,)?) => {$(
        pub fn $method(&self) -> Result<$ty> {
            self.inner.$method()
        }
    )*};
}

impl SingleValueDecodingContainer {
    pub fn new<C>(container: C) -> Self
    where
        C: SingleValueDecodingContainerProtocol + 'static,
    {
        SingleValueDecodingContainer {
            inner: Box::new(container),
        }
    }

    pub fn coding_path(&self) -> CodingPath {
        self.inner.coding_path()
    }

    pub fn decode_nil(&self) -> bool {
        self.inner.decode_nil()
    }

    single_primitive_decoders!(
        decode_bool -> bool,
        decode_i8 -> i8,
        decode_i16 -> i16,
        decode_i32 -> i32,
        decode_i64 -> i64,
        decode_u8 -> u8,
        decode_u16 -> u16,
        decode_u32 -> u32,
        decode_u64 -> u64,
        decode_f32 -> f32,
        decode_f64 -> f64,
        decode_string -> String,
    );

    pub fn decode<T: Decodable>(&self) -> Result<T> {
        let mut place: Option<T> = None;
        self.inner.decode_value(&mut place)?;
        take_place(place, || self.coding_path())
    }

    /// A `DataCorrupted` error attributed to this container's path.
    pub fn data_corrupted_error(&self, description: impl Into<String>) -> DecodingError {
        DecodingError::data_corrupted(Context::new(self.coding_path(), description))
    }
}
