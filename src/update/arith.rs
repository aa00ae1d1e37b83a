//! Overflow-checked arithmetic across the numeric cases.
//!
//! | left \ right | Int32            | Int64  | Double |
//! |--------------|------------------|--------|--------|
//! | Int32        | Int32, or Int64 on overflow | Int64 (checked) | Double |
//! | Int64        | Int64 (checked)  | Int64 (checked) | Double |
//! | Double       | Double           | Double | Double |
//!
//! Doubles follow IEEE-754 and saturate to infinity; integer results never wrap.

use thiserror::Error;

use crate::document::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithError {
    #[error("left operand is not a number")]
    LeftOperand,
    #[error("right operand is not a number")]
    RightOperand,
    #[error("integer result does not fit in 64 bits")]
    LongExceeded,
}

fn check_operands(a: &Value, b: &Value) -> Result<(), ArithError> {
    if !a.is_number() {
        return Err(ArithError::LeftOperand);
    }
    if !b.is_number() {
        return Err(ArithError::RightOperand);
    }
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(v: &Value) -> f64 {
    match v {
        Value::Int32(i) => f64::from(*i),
        Value::Int64(i) => *i as f64,
        Value::Double(d) => *d,
        _ => f64::NAN,
    }
}

fn as_i64(v: &Value) -> i64 {
    match v {
        Value::Int32(i) => i64::from(*i),
        Value::Int64(i) => *i,
        _ => 0,
    }
}

fn narrow(n: i64) -> Value {
    i32::try_from(n).map_or(Value::Int64(n), Value::Int32)
}

/// Adds two numbers following the promotion table.
///
/// # Errors
/// `LeftOperand`/`RightOperand` for non-numeric input, `LongExceeded` when an
/// Int64-involving sum overflows.
pub fn add(a: &Value, b: &Value) -> Result<Value, ArithError> {
    check_operands(a, b)?;
    match (a, b) {
        (Value::Double(_), _) | (_, Value::Double(_)) => Ok(Value::Double(as_f64(a) + as_f64(b))),
        (Value::Int32(x), Value::Int32(y)) => Ok(narrow(i64::from(*x) + i64::from(*y))),
        _ => as_i64(a).checked_add(as_i64(b)).map(Value::Int64).ok_or(ArithError::LongExceeded),
    }
}

/// Multiplies two numbers following the promotion table.
///
/// # Errors
/// Same as [`add`].
pub fn multiply(a: &Value, b: &Value) -> Result<Value, ArithError> {
    check_operands(a, b)?;
    match (a, b) {
        (Value::Double(_), _) | (_, Value::Double(_)) => Ok(Value::Double(as_f64(a) * as_f64(b))),
        (Value::Int32(x), Value::Int32(y)) => Ok(narrow(i64::from(*x) * i64::from(*y))),
        _ => multiply_long_safely(as_i64(a), as_i64(b)).map(Value::Int64),
    }
}

/// Multiplies two `i64`s, reporting overflow.
///
/// `0`, `1` and `i64::MIN` are handled before the general `(a*b)/b == a`
/// test, which would otherwise misreport them.
///
/// # Errors
/// `LongExceeded` on overflow.
pub fn multiply_long_safely(a: i64, b: i64) -> Result<i64, ArithError> {
    if a == 0 || b == 0 {
        return Ok(0);
    }
    if a == 1 {
        return Ok(b);
    }
    if b == 1 {
        return Ok(a);
    }
    if a == i64::MIN || b == i64::MIN {
        return Err(ArithError::LongExceeded);
    }
    let r = a.wrapping_mul(b);
    if r.checked_div(b) != Some(a) {
        return Err(ArithError::LongExceeded);
    }
    Ok(r)
}
