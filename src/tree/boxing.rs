//! Conversions between primitives and tree values.

use std::any::type_name;
use std::fmt::Display;

use crate::error::{Context, DecodingError, EncodingError};
use crate::key::CodingPath;
use crate::options::{NonConformingFloatDecodingStrategy, NonConformingFloatEncodingStrategy};
use crate::tree::node::SharedNode;
use crate::value::Value;

pub(crate) fn box_f64(
    value: f64,
    path: &CodingPath,
    strategy: &NonConformingFloatEncodingStrategy,
) -> Result<Value, EncodingError> {
    if value.is_finite() {
        return Ok(Value::Float(value));
    }
    match strategy {
        NonConformingFloatEncodingStrategy::Throw => Err(EncodingError::invalid_value(
            value,
            Context::new(
                path.clone(),
                format!(
                    "Unable to encode {value} directly in JSON. Use \
                     NonConformingFloatEncodingStrategy::ConvertToString to specify how the \
                     value should be encoded."
                ),
            ),
        )),
        NonConformingFloatEncodingStrategy::ConvertToString {
            positive_infinity,
            negative_infinity,
            nan,
        } => {
            let sentinel = if value.is_nan() {
                nan
            } else if value > 0.0 {
                positive_infinity
            } else {
                negative_infinity
            };
            Ok(Value::String(sentinel.clone()))
        }
    }
}

/// Widens through the shortest decimal form so `0.1f32` is written as `0.1`.
pub(crate) fn box_f32(
    value: f32,
    path: &CodingPath,
    strategy: &NonConformingFloatEncodingStrategy,
) -> Result<Value, EncodingError> {
    let widened = if value.is_finite() {
        value.to_string().parse().unwrap_or(f64::from(value))
    } else {
        f64::from(value)
    };
    box_f64(widened, path, strategy)
}

/// The error for a node that is not a `T`: `ValueNotFound` for null,
/// `TypeMismatch` otherwise.
pub(crate) fn mismatch<T: ?Sized>(path: &CodingPath, node: &SharedNode) -> DecodingError {
    mismatch_named(type_name::<T>(), path, node)
}

pub(crate) fn mismatch_named(
    expected: &'static str,
    path: &CodingPath,
    node: &SharedNode,
) -> DecodingError {
    if node.is_null() {
        DecodingError::ValueNotFound {
            expected,
            context: Context::new(
                path.clone(),
                format!("Expected {expected} value but found null instead."),
            ),
        }
    } else {
        DecodingError::TypeMismatch {
            expected,
            context: Context::new(
                path.clone(),
                format!(
                    "Expected to decode {expected} but found {} instead.",
                    node.type_description()
                ),
            ),
        }
    }
}

fn does_not_fit<T: ?Sized>(number: impl Display, path: &CodingPath) -> DecodingError {
    DecodingError::data_corrupted(Context::new(
        path.clone(),
        format!("Parsed JSON number <{number}> does not fit in {}.", type_name::<T>()),
    ))
}

pub(crate) fn unbox_bool(node: &SharedNode, path: &CodingPath) -> Result<bool, DecodingError> {
    match node {
        SharedNode::Scalar(Value::Bool(value)) => Ok(*value),
        other => Err(mismatch::<bool>(path, other)),
    }
}

// 2^64 and -2^63 are exact in f64.
const U64_BOUND: f64 = 18_446_744_073_709_551_616.0;
const I64_MIN: f64 = -9_223_372_036_854_775_808.0;

fn integral_float<T>(value: f64) -> Option<T>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    if !value.is_finite() || value.fract() != 0.0 {
        return None;
    }
    if (0.0..U64_BOUND).contains(&value) {
        T::try_from(value as u64).ok()
    } else if (I64_MIN..0.0).contains(&value) {
        T::try_from(value as i64).ok()
    } else {
        None
    }
}

/// Any integer type. Integral floats are accepted as long as they fit.
pub(crate) fn unbox_integer<T>(node: &SharedNode, path: &CodingPath) -> Result<T, DecodingError>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    match node {
        SharedNode::Scalar(Value::Integer(value)) => {
            T::try_from(*value).map_err(|_| does_not_fit::<T>(value, path))
        }
        SharedNode::Scalar(Value::Unsigned(value)) => {
            T::try_from(*value).map_err(|_| does_not_fit::<T>(value, path))
        }
        SharedNode::Scalar(Value::Float(value)) => {
            integral_float(*value).ok_or_else(|| does_not_fit::<T>(value, path))
        }
        other => Err(mismatch::<T>(path, other)),
    }
}

pub(crate) fn unbox_f64(
    node: &SharedNode,
    path: &CodingPath,
    strategy: &NonConformingFloatDecodingStrategy,
) -> Result<f64, DecodingError> {
    unbox_float::<f64>(node, path, strategy)
}

pub(crate) fn unbox_f32(
    node: &SharedNode,
    path: &CodingPath,
    strategy: &NonConformingFloatDecodingStrategy,
) -> Result<f32, DecodingError> {
    let value = unbox_float::<f32>(node, path, strategy)?;
    let narrowed = value as f32;
    // the shortest decimal of f32::MAX is slightly above it once parsed as f64
    if value.is_finite() && narrowed.is_infinite() {
        return Err(does_not_fit::<f32>(value, path));
    }
    Ok(narrowed)
}

fn unbox_float<T: ?Sized>(
    node: &SharedNode,
    path: &CodingPath,
    strategy: &NonConformingFloatDecodingStrategy,
) -> Result<f64, DecodingError> {
    match node {
        SharedNode::Scalar(Value::Float(value)) => Ok(*value),
        SharedNode::Scalar(Value::Integer(value)) => Ok(*value as f64),
        SharedNode::Scalar(Value::Unsigned(value)) => Ok(*value as f64),
        SharedNode::Scalar(Value::String(text)) => match strategy {
            NonConformingFloatDecodingStrategy::ConvertFromString {
                positive_infinity,
                negative_infinity,
                nan,
            } => {
                if text == positive_infinity {
                    Ok(f64::INFINITY)
                } else if text == negative_infinity {
                    Ok(f64::NEG_INFINITY)
                } else if text == nan {
                    Ok(f64::NAN)
                } else {
                    Err(mismatch::<T>(path, node))
                }
            }
            NonConformingFloatDecodingStrategy::Throw => Err(mismatch::<T>(path, node)),
        },
        other => Err(mismatch::<T>(path, other)),
    }
}

pub(crate) fn unbox_string(node: &SharedNode, path: &CodingPath) -> Result<String, DecodingError> {
    match node {
        SharedNode::Scalar(Value::String(text)) => Ok(text.clone()),
        other => Err(mismatch::<String>(path, other)),
    }
}
