//! Caller supplied, read-only context for custom `encode` / `decode` code.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Names one entry in a [`UserInfo`] map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodingUserInfoKey(String);

impl CodingUserInfoKey {
    pub fn new(raw_value: impl Into<String>) -> Self {
        CodingUserInfoKey(raw_value.into())
    }

    pub fn raw_value(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CodingUserInfoKey {
    fn from(raw_value: &str) -> Self {
        CodingUserInfoKey::new(raw_value)
    }
}

/// Opaque configuration handed to every `encode` / `decode` call of a pass.
///
/// The core never reads it; it is threaded through so implementations can pick
/// up cross-cutting settings without extra parameters.
///
/// ```
/// use codable_tree::{CodingUserInfoKey, UserInfo};
///
/// let info = UserInfo::new().with(CodingUserInfoKey::new("version"), 3u32);
/// assert_eq!(info.get::<u32>(&CodingUserInfoKey::new("version")), Some(&3));
/// assert_eq!(info.get::<String>(&CodingUserInfoKey::new("version")), None);
/// ```
#[derive(Clone, Default)]
pub struct UserInfo {
    entries: HashMap<CodingUserInfoKey, Arc<dyn Any + Send + Sync>>,
}

impl UserInfo {
    pub fn new() -> Self {
        UserInfo::default()
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, key: CodingUserInfoKey, value: T) {
        self.entries.insert(key, Arc::new(value));
    }

    /// Builder form of [`UserInfo::insert`].
    pub fn with<T: Any + Send + Sync>(mut self, key: CodingUserInfoKey, value: T) -> Self {
        self.insert(key, value);
        self
    }

    /// The entry for `key` if it exists and has type `T`.
    pub fn get<T: Any>(&self, key: &CodingUserInfoKey) -> Option<&T> {
        let value: &(dyn Any + Send + Sync) = self.entries.get(key)?.as_ref();
        value.downcast_ref::<T>()
    }

    pub fn contains_key(&self, key: &CodingUserInfoKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for UserInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut keys: Vec<&str> = self.entries.keys().map(|k| k.raw_value()).collect();
        keys.sort_unstable();
        f.debug_struct("UserInfo").field("keys", &keys).finish()
    }
}
