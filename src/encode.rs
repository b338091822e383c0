//! The encoding half of the container abstraction.
//!
//! A value implementing [`Encodable`] receives an [`Encoder`], asks it for
//! exactly one top-level container, and writes itself into that container.
//! Nested values are written by handing them to the container, which runs
//! their own `encode` one level deeper in the coding path.
//!
//! Formats implement the `*Protocol` traits. Callers only ever see the
//! wrapper structs ([`KeyedEncodingContainer`], [`UnkeyedEncodingContainer`],
//! [`SingleValueEncodingContainer`]), which own a boxed implementation and add
//! the generic conveniences trait objects cannot carry.
//!
//! # Example
//! ```
//! use codable_tree::{Encodable, Encoder, EncoderExt, EncodingError, coding_keys};
//!
//! coding_keys! {
//!     enum PointKeys {
//!         X = "x",
//!         Y = "y",
//!     }
//! }
//!
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! impl Encodable for Point {
//!     fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), EncodingError> {
//!         let mut container = encoder.container::<PointKeys>();
//!         container.encode(&self.x, PointKeys::X)?;
//!         container.encode(&self.y, PointKeys::Y)
//!     }
//! }
//!
//! let json = codable_tree::to_string(&Point { x: 1, y: -2 }).unwrap();
//! assert_eq!(json, r#"{"x":1,"y":-2}"#);
//! ```

use std::marker::PhantomData;

use crate::error::EncodingError;
use crate::key::{AnyCodingKey, CodingKey, CodingPath};
use crate::user_info::UserInfo;

type Result<T> = std::result::Result<T, EncodingError>;

/// A type that can write itself into an [`Encoder`].
pub trait Encodable {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<()>;
}

/// Hands out the single top-level container a value writes into.
///
/// Container requests never fail. Requesting a second container of a
/// different kind at the same coding path is a broken `encode`
/// implementation and panics.
pub trait Encoder {
    /// Keys from the root to the value currently being encoded.
    fn coding_path(&self) -> CodingPath;

    fn user_info(&self) -> &UserInfo;

    /// A keyed container with its key type erased; see
    /// [`EncoderExt::container`] for the typed form.
    fn keyed_container(&mut self) -> KeyedEncodingContainer<AnyCodingKey>;

    fn unkeyed_container(&mut self) -> UnkeyedEncodingContainer;

    fn single_value_container(&mut self) -> SingleValueEncodingContainer;
}

/// Generic conveniences over any [`Encoder`], including trait objects.
pub trait EncoderExt: Encoder {
    /// A keyed container addressed by `K`.
    fn container<K: CodingKey>(&mut self) -> KeyedEncodingContainer<K> {
        self.keyed_container().rekey()
    }
}

impl<E: Encoder + ?Sized> EncoderExt for E {}

/// Capability set of a format's keyed encoding container over keys `K`.
pub trait KeyedEncodingContainerProtocol<K: CodingKey> {
    fn coding_path(&self) -> CodingPath;

    fn encode_nil(&mut self, key: &K) -> Result<()>;
    fn encode_bool(&mut self, value: bool, key: &K) -> Result<()>;
    fn encode_i8(&mut self, value: i8, key: &K) -> Result<()>;
    fn encode_i16(&mut self, value: i16, key: &K) -> Result<()>;
    fn encode_i32(&mut self, value: i32, key: &K) -> Result<()>;
    fn encode_i64(&mut self, value: i64, key: &K) -> Result<()>;
    fn encode_u8(&mut self, value: u8, key: &K) -> Result<()>;
    fn encode_u16(&mut self, value: u16, key: &K) -> Result<()>;
    fn encode_u32(&mut self, value: u32, key: &K) -> Result<()>;
    fn encode_u64(&mut self, value: u64, key: &K) -> Result<()>;
    fn encode_f32(&mut self, value: f32, key: &K) -> Result<()>;
    fn encode_f64(&mut self, value: f64, key: &K) -> Result<()>;
    fn encode_str(&mut self, value: &str, key: &K) -> Result<()>;

    /// Encodes a nested value at `key`, one level deeper in the coding path.
    fn encode_value(&mut self, value: &dyn Encodable, key: &K) -> Result<()>;

    fn nested_container(&mut self, key: &K) -> KeyedEncodingContainer<AnyCodingKey>;
    fn nested_unkeyed_container(&mut self, key: &K) -> UnkeyedEncodingContainer;

    /// An encoder writing to the format's reserved super key.
    fn super_encoder(&mut self) -> Box<dyn Encoder>;
    fn super_encoder_for_key(&mut self, key: &K) -> Box<dyn Encoder>;
}

/// Capability set of a format's unkeyed (sequential) encoding container.
pub trait UnkeyedEncodingContainerProtocol {
    fn coding_path(&self) -> CodingPath;

    /// Number of elements written so far.
    fn count(&self) -> usize;

    fn encode_nil(&mut self) -> Result<()>;
    fn encode_bool(&mut self, value: bool) -> Result<()>;
    fn encode_i8(&mut self, value: i8) -> Result<()>;
    fn encode_i16(&mut self, value: i16) -> Result<()>;
    fn encode_i32(&mut self, value: i32) -> Result<()>;
    fn encode_i64(&mut self, value: i64) -> Result<()>;
    fn encode_u8(&mut self, value: u8) -> Result<()>;
    fn encode_u16(&mut self, value: u16) -> Result<()>;
    fn encode_u32(&mut self, value: u32) -> Result<()>;
    fn encode_u64(&mut self, value: u64) -> Result<()>;
    fn encode_f32(&mut self, value: f32) -> Result<()>;
    fn encode_f64(&mut self, value: f64) -> Result<()>;
    fn encode_str(&mut self, value: &str) -> Result<()>;
    fn encode_value(&mut self, value: &dyn Encodable) -> Result<()>;

    fn nested_container(&mut self) -> KeyedEncodingContainer<AnyCodingKey>;
    fn nested_unkeyed_container(&mut self) -> UnkeyedEncodingContainer;

    /// An encoder writing to a slot appended at the current position.
    fn super_encoder(&mut self) -> Box<dyn Encoder>;
}

/// Capability set of a format's single-value encoding container.
///
/// Exactly one write is allowed per container; a second write panics.
pub trait SingleValueEncodingContainerProtocol {
    fn coding_path(&self) -> CodingPath;

    fn encode_nil(&mut self) -> Result<()>;
    fn encode_bool(&mut self, value: bool) -> Result<()>;
    fn encode_i8(&mut self, value: i8) -> Result<()>;
    fn encode_i16(&mut self, value: i16) -> Result<()>;
    fn encode_i32(&mut self, value: i32) -> Result<()>;
    fn encode_i64(&mut self, value: i64) -> Result<()>;
    fn encode_u8(&mut self, value: u8) -> Result<()>;
    fn encode_u16(&mut self, value: u16) -> Result<()>;
    fn encode_u32(&mut self, value: u32) -> Result<()>;
    fn encode_u64(&mut self, value: u64) -> Result<()>;
    fn encode_f32(&mut self, value: f32) -> Result<()>;
    fn encode_f64(&mut self, value: f64) -> Result<()>;
    fn encode_str(&mut self, value: &str) -> Result<()>;
    fn encode_value(&mut self, value: &dyn Encodable) -> Result<()>;
}

/// A keyed encoding container addressed by keys of type `K`.
///
/// Owns some format's implementation of [`KeyedEncodingContainerProtocol`]
/// for `K` and forwards every call to it.
pub struct KeyedEncodingContainer<K: CodingKey> {
    inner: Box<dyn KeyedEncodingContainerProtocol<K>>,
}

macro_rules! keyed_primitive_encoders {
    ($($method:ident($ty:ty)),* $(,)?) => {$(
        pub fn $method(&mut self, value: $ty, key: K) -> Result<()> {
            self.inner.$method(value, &key)
        }
    )*};
}

impl<K: CodingKey> KeyedEncodingContainer<K> {
    pub fn new<C>(container: C) -> Self
    where
        C: KeyedEncodingContainerProtocol<K> + 'static,
    {
        KeyedEncodingContainer {
            inner: Box::new(container),
        }
    }

    pub fn coding_path(&self) -> CodingPath {
        self.inner.coding_path()
    }

    pub fn encode_nil(&mut self, key: K) -> Result<()> {
        self.inner.encode_nil(&key)
    }

    keyed_primitive_encoders!(
        encode_bool(bool),
        encode_i8(i8),
        encode_i16(i16),
        encode_i32(i32),
        encode_i64(i64),
        encode_u8(u8),
        encode_u16(u16),
        encode_u32(u32),
        encode_u64(u64),
        encode_f32(f32),
        encode_f64(f64),
        encode_str(&str),
    );

    pub fn encode<T: Encodable>(&mut self, value: &T, key: K) -> Result<()> {
        self.inner.encode_value(value, &key)
    }

    /// Encodes the wrapped value, or writes nothing at all for `None`.
    pub fn encode_if_present<T: Encodable>(&mut self, value: &Option<T>, key: K) -> Result<()> {
        match value {
            Some(value) => self.encode(value, key),
            None => Ok(()),
        }
    }

    pub fn nested_container<NK: CodingKey>(&mut self, key: K) -> KeyedEncodingContainer<NK> {
        self.inner.nested_container(&key).rekey()
    }

    pub fn nested_unkeyed_container(&mut self, key: K) -> UnkeyedEncodingContainer {
        self.inner.nested_unkeyed_container(&key)
    }

    pub fn super_encoder(&mut self) -> Box<dyn Encoder> {
        self.inner.super_encoder()
    }

    pub fn super_encoder_for_key(&mut self, key: K) -> Box<dyn Encoder> {
        self.inner.super_encoder_for_key(&key)
    }
}

impl KeyedEncodingContainer<AnyCodingKey> {
    /// Re-types an erased container for the caller's key type.
    pub fn rekey<K: CodingKey>(self) -> KeyedEncodingContainer<K> {
        KeyedEncodingContainer::new(Rekeyed {
            inner: self.inner,
            marker: PhantomData,
        })
    }
}

/// Adapts an erased container to a concrete key type by projecting each key
/// onto [`AnyCodingKey`].
struct Rekeyed<K> {
    inner: Box<dyn KeyedEncodingContainerProtocol<AnyCodingKey>>,
    marker: PhantomData<fn(K)>,
}

macro_rules! rekeyed_primitive_encoders {
    ($($method:ident($ty:ty)),* $(,)?) => {$(
        fn $method(&mut self, value: $ty, key: &K) -> Result<()> {
            self.inner.$method(value, &AnyCodingKey::from_key(key))
        }
    )*};
}

impl<K: CodingKey> KeyedEncodingContainerProtocol<K> for Rekeyed<K> {
    fn coding_path(&self) -> CodingPath {
        self.inner.coding_path()
    }

    fn encode_nil(&mut self, key: &K) -> Result<()> {
        self.inner.encode_nil(&AnyCodingKey::from_key(key))
    }

    rekeyed_primitive_encoders!(
        encode_bool(bool),
        encode_i8(i8),
        encode_i16(i16),
        encode_i32(i32),
        encode_i64(i64),
        encode_u8(u8),
        encode_u16(u16),
        encode_u32(u32),
        encode_u64(u64),
        encode_f32(f32),
        encode_f64(f64),
        encode_str(&str),
    );

    fn encode_value(&mut self, value: &dyn Encodable, key: &K) -> Result<()> {
        self.inner.encode_value(value, &AnyCodingKey::from_key(key))
    }

    fn nested_container(&mut self, key: &K) -> KeyedEncodingContainer<AnyCodingKey> {
        self.inner.nested_container(&AnyCodingKey::from_key(key))
    }

    fn nested_unkeyed_container(&mut self, key: &K) -> UnkeyedEncodingContainer {
        self.inner.nested_unkeyed_container(&AnyCodingKey::from_key(key))
    }

    fn super_encoder(&mut self) -> Box<dyn Encoder> {
        self.inner.super_encoder()
    }

    fn super_encoder_for_key(&mut self, key: &K) -> Box<dyn Encoder> {
        self.inner.super_encoder_for_key(&AnyCodingKey::from_key(key))
    }
}

/// A sequential encoding container.
pub struct UnkeyedEncodingContainer {
    inner: Box<dyn UnkeyedEncodingContainerProtocol>,
}

macro_rules! unkeyed_primitive_encoders {
    ($($method:ident($ty:ty)),* $(,)?) => {$(
        pub fn $method(&mut self, value: $ty) -> Result<()> {
            self.inner.$method(value)
        }
    )*};
}

impl UnkeyedEncodingContainer {
    pub fn new<C>(container: C) -> Self
    where
        C: UnkeyedEncodingContainerProtocol + 'static,
    {
        UnkeyedEncodingContainer {
            inner: Box::new(container),
        }
    }

    pub fn coding_path(&self) -> CodingPath {
        self.inner.coding_path()
    }

    pub fn count(&self) -> usize {
        self.inner.count()
    }

    pub fn encode_nil(&mut self) -> Result<()> {
        self.inner.encode_nil()
    }

    unkeyed_primitive_encoders!(
        encode_bool(bool),
        encode_i8(i8),
        encode_i16(i16),
        encode_i32(i32),
        encode_i64(i64),
        encode_u8(u8),
        encode_u16(u16),
        encode_u32(u32),
        encode_u64(u64),
        encode_f32(f32),
        encode_f64(f64),
        encode_str(&str),
    );

    pub fn encode<T: Encodable>(&mut self, value: &T) -> Result<()> {
        self.inner.encode_value(value)
    }

    /// Appends the wrapped value, or a null for `None`.
    pub fn encode_if_present<T: Encodable>(&mut self, value: &Option<T>) -> Result<()> {
        match value {
            Some(value) => self.encode(value),
            None => self.encode_nil(),
        }
    }

    /// Appends every element of `values` in order.
    pub fn encode_contents_of<'a, T, I>(&mut self, values: I) -> Result<()>
    where
        T: Encodable + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        for value in values {
            self.encode(value)?;
        }
        Ok(())
    }

    pub fn nested_container<K: CodingKey>(&mut self) -> KeyedEncodingContainer<K> {
        self.inner.nested_container().rekey()
    }

    pub fn nested_unkeyed_container(&mut self) -> UnkeyedEncodingContainer {
        self.inner.nested_unkeyed_container()
    }

    pub fn super_encoder(&mut self) -> Box<dyn Encoder> {
        self.inner.super_encoder()
    }
}

/// A container holding exactly one value.
pub struct SingleValueEncodingContainer {
    inner: Box<dyn SingleValueEncodingContainerProtocol>,
}

impl SingleValueEncodingContainer {
    pub fn new<C>(container: C) -> Self
    where
        C: SingleValueEncodingContainerProtocol + 'static,
    {
        SingleValueEncodingContainer {
            inner: Box::new(container),
        }
    }

    pub fn coding_path(&self) -> CodingPath {
        self.inner.coding_path()
    }

    pub fn encode_nil(&mut self) -> Result<()> {
        self.inner.encode_nil()
    }

    unkeyed_primitive_encoders!(
        encode_bool(bool),
        encode_i8(i8),
        encode_i16(i16),
        encode_i32(i32),
        encode_i64(i64),
        encode_u8(u8),
        encode_u16(u16),
        encode_u32(u32),
        encode_u64(u64),
        encode_f32(f32),
        encode_f64(f64),
        encode_str(&str),
    );

    pub fn encode<T: Encodable>(&mut self, value: &T) -> Result<()> {
        self.inner.encode_value(value)
    }
}
