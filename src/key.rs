//! Coding keys and coding paths.
//!
//! A [`CodingKey`] names one lookup slot in a keyed container (or, through its
//! integer projection, a position). A [`CodingPath`] is the ordered list of keys
//! from the document root down to the value currently being processed and is
//! stamped into every error.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

/// A key addressing a slot in a keyed container.
///
/// Keys are interchangeable for lookup exactly when their string values match;
/// the integer value is an optional secondary projection.
///
/// Implementations may reject strings or integers outside their key space,
/// which is how closed per-field key enums are expressed. The
/// [`coding_keys!`](crate::coding_keys) macro generates such an enum.
///
/// # Example
/// ```
/// use codable_tree::{AnyCodingKey, CodingKey};
///
/// let key = AnyCodingKey::new("name");
/// assert_eq!(key.string_value(), "name");
/// assert_eq!(key.int_value(), None);
/// assert_eq!(key.description(), "AnyCodingKey(stringValue: \"name\", intValue: nil)");
/// ```
pub trait CodingKey: fmt::Debug + 'static {
    /// The string projection of the key, always present.
    fn string_value(&self) -> &str;

    /// The integer projection of the key, if it has one.
    fn int_value(&self) -> Option<i64> {
        None
    }

    /// Builds a key from its string projection, or `None` if the string is not
    /// part of this key space.
    fn from_string_value(value: &str) -> Option<Self>
    where
        Self: Sized;

    /// Builds a key from its integer projection, or `None` if the integer is not
    /// part of this key space.
    fn from_int_value(value: i64) -> Option<Self>
    where
        Self: Sized;

    /// `TypeName(stringValue: "s", intValue: i)`, with `nil` for a missing integer.
    fn description(&self) -> String {
        let name = short_type_name(std::any::type_name::<Self>());
        match self.int_value() {
            Some(int) => format!(
                "{name}(stringValue: \"{}\", intValue: {int})",
                self.string_value()
            ),
            None => format!(
                "{name}(stringValue: \"{}\", intValue: nil)",
                self.string_value()
            ),
        }
    }
}

fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// A key that accepts any string or integer.
///
/// This is the key type containers use once the caller's key type has been
/// erased, and the one used for positions in unkeyed containers
/// (`"Index N"`), for map entries, and for the reserved super key.
#[derive(Debug, Clone, Eq)]
pub struct AnyCodingKey {
    string_value: String,
    int_value: Option<i64>,
}

impl AnyCodingKey {
    /// A string-only key.
    pub fn new(string_value: impl Into<String>) -> Self {
        AnyCodingKey {
            string_value: string_value.into(),
            int_value: None,
        }
    }

    /// A key carrying both projections.
    pub fn with_int_value(string_value: impl Into<String>, int_value: i64) -> Self {
        AnyCodingKey {
            string_value: string_value.into(),
            int_value: Some(int_value),
        }
    }

    /// An integer key whose string projection is the decimal literal.
    pub fn from_int(int_value: i64) -> Self {
        AnyCodingKey::with_int_value(int_value.to_string(), int_value)
    }

    /// The key unkeyed containers record for the element at `index`.
    pub fn index(index: usize) -> Self {
        AnyCodingKey::with_int_value(format!("Index {index}"), index as i64)
    }

    /// The default reserved key used by `super_encoder()` / `super_decoder()`.
    pub fn super_key() -> Self {
        AnyCodingKey::with_int_value("super", 0)
    }

    /// Copies both projections out of any other key.
    pub fn from_key<K: CodingKey + ?Sized>(key: &K) -> Self {
        AnyCodingKey {
            string_value: key.string_value().to_owned(),
            int_value: key.int_value(),
        }
    }

    fn is_index(&self) -> bool {
        self.int_value.is_some() && self.string_value.starts_with("Index ")
    }
}

impl CodingKey for AnyCodingKey {
    fn string_value(&self) -> &str {
        &self.string_value
    }

    fn int_value(&self) -> Option<i64> {
        self.int_value
    }

    fn from_string_value(value: &str) -> Option<Self> {
        Some(AnyCodingKey::new(value))
    }

    fn from_int_value(value: i64) -> Option<Self> {
        Some(AnyCodingKey::from_int(value))
    }
}

// Lookup identity is the string projection only.
impl PartialEq for AnyCodingKey {
    fn eq(&self, other: &Self) -> bool {
        self.string_value == other.string_value
    }
}

impl Hash for AnyCodingKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.string_value.hash(state);
    }
}

impl fmt::Display for AnyCodingKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.string_value)
    }
}

impl From<&str> for AnyCodingKey {
    fn from(value: &str) -> Self {
        AnyCodingKey::new(value)
    }
}

impl From<String> for AnyCodingKey {
    fn from(value: String) -> Self {
        AnyCodingKey::new(value)
    }
}

/// The route of keys from the document root to the value being processed.
///
/// Renders as `a.b[1].c`, or `<root>` when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodingPath(Vec<AnyCodingKey>);

impl CodingPath {
    /// The empty path.
    pub fn root() -> Self {
        CodingPath(Vec::new())
    }

    /// A copy of this path with `key` appended.
    pub fn appending<K: CodingKey + ?Sized>(&self, key: &K) -> Self {
        let mut keys = Vec::with_capacity(self.0.len() + 1);
        keys.extend_from_slice(&self.0);
        keys.push(AnyCodingKey::from_key(key));
        CodingPath(keys)
    }

    /// The keys, root first.
    pub fn keys(&self) -> &[AnyCodingKey] {
        &self.0
    }

    /// The string projection of every key, root first.
    pub fn string_values(&self) -> Vec<&str> {
        self.0.iter().map(|key| key.string_value()).collect()
    }
}

impl Deref for CodingPath {
    type Target = [AnyCodingKey];

    fn deref(&self) -> &[AnyCodingKey] {
        &self.0
    }
}

impl From<Vec<AnyCodingKey>> for CodingPath {
    fn from(keys: Vec<AnyCodingKey>) -> Self {
        CodingPath(keys)
    }
}

impl FromIterator<AnyCodingKey> for CodingPath {
    fn from_iter<I: IntoIterator<Item = AnyCodingKey>>(iter: I) -> Self {
        CodingPath(iter.into_iter().collect())
    }
}

impl fmt::Display for CodingPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (position, key) in self.0.iter().enumerate() {
            match key.int_value() {
                Some(index) if key.is_index() => write!(f, "[{index}]")?,
                _ if position == 0 => f.write_str(key.string_value())?,
                _ => write!(f, ".{}", key.string_value())?,
            }
        }
        Ok(())
    }
}

/// Declares a closed key enum implementing [`CodingKey`].
///
/// Each variant names its string value and, optionally, an integer value.
/// Strings and integers outside the listed set are rejected.
///
/// ```
/// use codable_tree::{CodingKey, coding_keys};
///
/// coding_keys! {
///     enum PointKeys {
///         X = "x": 0,
///         Y = "y": 1,
///         Label = "label",
///     }
/// }
///
/// assert_eq!(PointKeys::Y.string_value(), "y");
/// assert_eq!(PointKeys::from_int_value(0), Some(PointKeys::X));
/// assert_eq!(PointKeys::from_string_value("z"), None);
/// assert_eq!(PointKeys::Label.int_value(), None);
/// ```
#[macro_export]
macro_rules! coding_keys {
    (@int) => { None };
    (@int $int:literal) => { Some($int) };
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident = $string:literal $(: $int:literal)?),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),*
        }

        impl $crate::CodingKey for $name {
            fn string_value(&self) -> &str {
                match self {
                    $($name::$variant => $string),*
                }
            }

            fn int_value(&self) -> Option<i64> {
                match self {
                    $($name::$variant => $crate::coding_keys!(@int $($int)?)),*
                }
            }

            fn from_string_value(value: &str) -> Option<Self> {
                match value {
                    $($string => Some($name::$variant),)*
                    _ => None,
                }
            }

            fn from_int_value(value: i64) -> Option<Self> {
                $(
                    if $crate::coding_keys!(@int $($int)?) == Some(value) {
                        return Some($name::$variant);
                    }
                )*
                None
            }
        }
    };
}
