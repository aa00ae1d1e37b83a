//! Numeric helpers: whole-number parameter parsing and checked conversions.
//!
//! Parameters such as sort directions, `$pop` operands, skip/limit and batch
//! sizes arrive as any of the three numeric cases. They are normalized through
//! [`whole_number`] so that `1`, `1_i64` and `1.0` are interchangeable while
//! `1.5`, infinities and out-of-range doubles are rejected.

use thiserror::Error;

use crate::document::Value;
use crate::errors::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NumError {
    #[error("value is infinite")]
    Infinity,
    #[error("value is not a whole number")]
    NotWholeNumber,
    #[error("value does not fit in a 64-bit integer")]
    LongExceeded,
    #[error("value is not a number")]
    UnexpectedType,
}

// 2^63 as f64; every double in [-2^63, 2^63) converts to i64 exactly.
const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

/// Extracts a whole number from an Int32, Int64 or integral Double.
///
/// # Errors
/// See [`NumError`].
pub fn whole_number(v: &Value) -> Result<i64, NumError> {
    match v {
        Value::Int32(i) => Ok(i64::from(*i)),
        Value::Int64(i) => Ok(*i),
        Value::Double(d) => {
            if d.is_infinite() {
                return Err(NumError::Infinity);
            }
            if d.is_nan() || d.fract() != 0.0 {
                return Err(NumError::NotWholeNumber);
            }
            if *d < -TWO_POW_63 || *d >= TWO_POW_63 {
                return Err(NumError::LongExceeded);
            }
            #[allow(clippy::cast_possible_truncation)]
            Ok(*d as i64)
        }
        _ => Err(NumError::UnexpectedType),
    }
}

/// Maps a [`NumError`] onto the user-facing error for `field`.
#[must_use]
pub fn num_error(field: &str, e: NumError, v: &Value) -> DbError {
    match e {
        NumError::Infinity => DbError::Infinity { field: field.to_owned(), msg: format!("{v} is infinite") },
        NumError::NotWholeNumber => DbError::NotWholeNumber { field: field.to_owned() },
        NumError::LongExceeded => DbError::LongExceeded {
            field: field.to_owned(),
            msg: format!("{v} is out of range for a 64-bit integer"),
        },
        NumError::UnexpectedType => {
            DbError::type_mismatch(field, format!("Expected a number in: {field}: {v}, got {}", v.type_name()))
        }
    }
}

/// Whole-number parameter narrowed to `i32`.
///
/// # Errors
/// `IntExceeded` when the value does not fit 32 bits, otherwise as [`whole_number`].
pub fn whole_i32(field: &str, v: &Value) -> Result<i32, DbError> {
    let n = whole_number(v).map_err(|e| num_error(field, e, v))?;
    i32::try_from(n).map_err(|_| DbError::IntExceeded {
        field: field.to_owned(),
        msg: format!("{v} is out of range for a 32-bit integer"),
    })
}

#[inline]
#[must_use]
pub fn usize_to_u64(v: usize) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

#[inline]
#[must_use]
pub fn u64_to_usize_saturating(v: u64) -> usize {
    usize::try_from(v).unwrap_or(usize::MAX)
}

#[inline]
#[must_use]
pub fn u128_to_u64_saturating(v: u128) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}
