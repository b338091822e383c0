//! Error taxonomy for both coding directions.
//!
//! Data problems are always reported through these types. Container protocol
//! violations (two different top-level containers, a second write through a
//! single-value container) are programming errors and panic instead.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::key::{AnyCodingKey, CodingKey, CodingPath};

/// Underlying cause attached to a [`Context`].
pub type UnderlyingError = Arc<dyn std::error::Error + Send + Sync>;

/// Message for a keyed lookup that found nothing under `key`.
pub(crate) fn missing_key_description<K: CodingKey>(key: &K) -> String {
    format!(
        "No value associated with key {} (\"{}\").",
        key.description(),
        key.string_value()
    )
}

/// Where and why a coding operation failed.
#[derive(Clone)]
pub struct Context {
    /// Path to the value that failed.
    pub coding_path: CodingPath,
    /// Human readable explanation.
    pub debug_description: String,
    /// Lower level cause, if any.
    pub underlying_error: Option<UnderlyingError>,
}

impl Context {
    pub fn new(coding_path: CodingPath, debug_description: impl Into<String>) -> Self {
        Context {
            coding_path,
            debug_description: debug_description.into(),
            underlying_error: None,
        }
    }

    pub fn with_underlying_error<E>(mut self, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.underlying_error = Some(Arc::new(error));
        self
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Context")
            .field("coding_path", &self.coding_path.to_string())
            .field("debug_description", &self.debug_description)
            .field(
                "underlying_error",
                &self.underlying_error.as_ref().map(|e| e.to_string()),
            )
            .finish()
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (at {})", self.debug_description, self.coding_path)?;
        if let Some(underlying) = &self.underlying_error {
            write!(f, ": {underlying}")?;
        }
        Ok(())
    }
}

/// A failure while turning a tree back into typed values.
#[derive(Debug, Clone, Error)]
pub enum DecodingError {
    /// The value is present but has the wrong shape for `expected`.
    #[error("type mismatch for {expected}: {context}")]
    TypeMismatch {
        expected: &'static str,
        context: Context,
    },
    /// The value is null (or the container is exhausted) but `expected` was required.
    #[error("value not found for {expected}: {context}")]
    ValueNotFound {
        expected: &'static str,
        context: Context,
    },
    /// A keyed container has no entry for `key`.
    #[error("key `{key}` not found: {context}")]
    KeyNotFound { key: AnyCodingKey, context: Context },
    /// The data violates a structural invariant the other variants don't cover.
    #[error("data corrupted: {0}")]
    DataCorrupted(Context),
}

impl DecodingError {
    pub fn type_mismatch<T: ?Sized>(context: Context) -> Self {
        DecodingError::TypeMismatch {
            expected: type_name::<T>(),
            context,
        }
    }

    pub fn value_not_found<T: ?Sized>(context: Context) -> Self {
        DecodingError::ValueNotFound {
            expected: type_name::<T>(),
            context,
        }
    }

    pub fn key_not_found<K: CodingKey + ?Sized>(key: &K, context: Context) -> Self {
        DecodingError::KeyNotFound {
            key: AnyCodingKey::from_key(key),
            context,
        }
    }

    pub fn data_corrupted(context: Context) -> Self {
        DecodingError::DataCorrupted(context)
    }

    pub fn context(&self) -> &Context {
        match self {
            DecodingError::TypeMismatch { context, .. }
            | DecodingError::ValueNotFound { context, .. }
            | DecodingError::KeyNotFound { context, .. }
            | DecodingError::DataCorrupted(context) => context,
        }
    }

    pub fn coding_path(&self) -> &CodingPath {
        &self.context().coding_path
    }
}

/// A failure while turning typed values into a tree.
#[derive(Debug, Clone, Error)]
pub enum EncodingError {
    /// `value` cannot be represented in the target format.
    #[error("invalid value {value}: {context}")]
    InvalidValue { value: String, context: Context },
}

impl EncodingError {
    pub fn invalid_value(value: impl fmt::Display, context: Context) -> Self {
        EncodingError::InvalidValue {
            value: value.to_string(),
            context,
        }
    }

    pub fn context(&self) -> &Context {
        match self {
            EncodingError::InvalidValue { context, .. } => context,
        }
    }

    pub fn coding_path(&self) -> &CodingPath {
        &self.context().coding_path
    }
}
