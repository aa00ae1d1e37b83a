//! Operands of the non-comparison leaf operators: `$type`, `$mod`, `$regex`
//! and the `$bits*` family.
//!
//! Each operand is validated once at compile time; matching against a
//! single value is a plain function over the parsed form.

use regex::{Regex, RegexBuilder};

use crate::document::Value;
use crate::errors::DbError;
use crate::utils::num::{NumError, whole_number};

/// `$type` aliases with their BSON type codes. Aliases without an in-memory
/// representation are accepted and never match.
const TYPE_ALIASES: &[(&str, i64)] = &[
    ("double", 1),
    ("string", 2),
    ("object", 3),
    ("array", 4),
    ("binData", 5),
    ("undefined", 6),
    ("objectId", 7),
    ("bool", 8),
    ("date", 9),
    ("null", 10),
    ("regex", 11),
    ("dbPointer", 12),
    ("javascript", 13),
    ("symbol", 14),
    ("javascriptWithScope", 15),
    ("int", 16),
    ("timestamp", 17),
    ("long", 18),
    ("decimal", 19),
    ("minKey", -1),
    ("maxKey", 127),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTest {
    /// One alias as reported by [`Value::type_name`].
    Alias(&'static str),
    /// `"number"`: int, long or double.
    Number,
}

impl TypeTest {
    fn parse(op: &str, v: &Value) -> Result<Self, DbError> {
        match v {
            Value::String(s) if s == "number" => Ok(Self::Number),
            Value::String(s) => TYPE_ALIASES
                .iter()
                .find(|(alias, _)| *alias == s.as_str())
                .map(|(alias, _)| Self::Alias(*alias))
                .ok_or_else(|| DbError::bad_value(op, format!("Unknown type name alias: {s}"))),
            v if v.is_number() => {
                let code = whole_number(v)
                    .map_err(|_| DbError::bad_value(op, format!("Invalid numerical type code: {v}")))?;
                TYPE_ALIASES
                    .iter()
                    .find(|(_, c)| *c == code)
                    .map(|(alias, _)| Self::Alias(*alias))
                    .ok_or_else(|| DbError::bad_value(op, format!("Invalid numerical type code: {code}")))
            }
            other => Err(DbError::type_mismatch(
                op,
                format!("type must be represented as a number or a string, got {}", other.type_name()),
            )),
        }
    }

    fn accepts(self, v: &Value) -> bool {
        match self {
            Self::Number => v.is_number(),
            Self::Alias(alias) => v.type_name() == alias,
        }
    }
}

/// Parses a `$type` operand: one alias or code, or a non-empty array of them.
///
/// # Errors
/// `BadValue` for unknown aliases or codes and for an empty array.
pub fn parse_types(op: &str, operand: &Value) -> Result<Vec<TypeTest>, DbError> {
    match operand {
        Value::Array(items) if items.is_empty() => Err(DbError::bad_value(op, "at least one type must be specified")),
        Value::Array(items) => items.iter().map(|v| TypeTest::parse(op, v)).collect(),
        v => Ok(vec![TypeTest::parse(op, v)?]),
    }
}

/// The value itself has one of `types`, or it is an array holding a
/// non-array element that does.
#[must_use]
pub fn type_matches(v: &Value, types: &[TypeTest]) -> bool {
    let hit = |e: &Value| types.iter().any(|t| t.accepts(e));
    hit(v)
        || matches!(v, Value::Array(items) if items.iter().any(|e| !matches!(e, Value::Array(_)) && hit(e)))
}

/// Parsed `$mod: [divisor, remainder]`. Both sides truncate toward zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modulo {
    pub divisor: i64,
    pub remainder: i64,
}

fn truncated(v: &Value) -> Result<i64, &'static str> {
    match v {
        Value::Int32(i) => Ok(i64::from(*i)),
        Value::Int64(i) => Ok(*i),
        Value::Double(d) if !d.is_finite() => {
            Err("value is invalid :: caused by :: Unable to coerce NaN/Inf to integral type")
        }
        Value::Double(d) => whole_number(&Value::Double(d.trunc()))
            .map_err(|_| "value is invalid :: caused by :: Out of bounds coercing to integral value"),
        _ => Err("not a number"),
    }
}

impl Modulo {
    /// # Errors
    /// `BadValue` unless the operand is a two-element numeric array with a
    /// non-zero divisor.
    pub fn parse(op: &str, operand: &Value) -> Result<Self, DbError> {
        let Value::Array(items) = operand else {
            return Err(DbError::bad_value(op, "malformed mod, needs to be an array"));
        };
        let [d, r] = items.as_slice() else {
            let why = if items.len() < 2 { "not enough elements" } else { "too many elements" };
            return Err(DbError::bad_value(op, format!("malformed mod, {why}")));
        };
        let divisor = truncated(d).map_err(|why| DbError::bad_value(op, format!("malformed mod, divisor {why}")))?;
        let remainder =
            truncated(r).map_err(|why| DbError::bad_value(op, format!("malformed mod, remainder {why}")))?;
        if divisor == 0 {
            return Err(DbError::bad_value(op, "divisor cannot be 0"));
        }
        Ok(Self { divisor, remainder })
    }

    /// Only numbers match; NaN, infinities and doubles outside the 64-bit
    /// range never do.
    #[must_use]
    pub fn matches(self, v: &Value) -> bool {
        if !v.is_number() {
            return false;
        }
        // i64::MIN % -1 overflows; its true remainder is 0.
        truncated(v).is_ok_and(|n| n.checked_rem(self.divisor).unwrap_or(0) == self.remainder)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitTest {
    AllSet,
    AllClear,
    AnySet,
    AnyClear,
}

impl BitTest {
    #[must_use]
    pub fn from_operator(op: &str) -> Option<Self> {
        Some(match op {
            "$bitsAllSet" => Self::AllSet,
            "$bitsAllClear" => Self::AllClear,
            "$bitsAnySet" => Self::AnySet,
            "$bitsAnyClear" => Self::AnyClear,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn test(self, bits: u64, mask: u64) -> bool {
        match self {
            Self::AllSet => bits & mask == mask,
            Self::AllClear => bits & mask == 0,
            Self::AnySet => bits & mask != 0,
            Self::AnyClear => bits & mask != mask,
        }
    }
}

/// Parses a `$bits*` operand into a 64-bit mask.
///
/// A number is the mask itself. An array lists bit positions, where positions
/// past 63 stand for the sign bit. BinData is read little-endian and any set
/// byte past the eighth also maps to the sign bit.
///
/// # Errors
/// `BadValue` for negative or fractional masks and positions, or any other
/// operand type.
pub fn parse_bitmask(op: &str, operand: &Value) -> Result<u64, DbError> {
    match operand {
        Value::Array(positions) => positions.iter().enumerate().try_fold(0u64, |mask, (i, v)| {
            let pos = whole_number(v).map_err(|e| {
                let expected = if e == NumError::UnexpectedType { "a number in" } else { "integer" };
                DbError::bad_value(op, format!("Failed to parse bit position. Expected {expected}: {i}: {v}"))
            })?;
            if pos < 0 {
                return Err(DbError::bad_value(
                    op,
                    format!("Failed to parse bit position. Expected a non-negative number in: {i}: {pos}"),
                ));
            }
            Ok(mask | 1u64 << pos.min(63))
        }),
        Value::Binary(b) => Ok(b.bytes.iter().enumerate().fold(0u64, |mask, (i, &byte)| match i {
            _ if byte == 0 => mask,
            0..8 => mask | u64::from(byte) << (i * 8),
            _ => mask | 1u64 << 63,
        })),
        v if v.is_number() => {
            let n = whole_number(v).map_err(|_| DbError::bad_value(op, format!("Expected an integer: {op}: {v}")))?;
            u64::try_from(n).map_err(|_| DbError::bad_value(op, format!("Expected a non-negative number in: {op}: {v}")))
        }
        other => Err(DbError::bad_value(
            op,
            format!("{op} takes an Array, a number, or a BinData but received: {other}"),
        )),
    }
}

/// Two's-complement bits of an integral number. Fractional doubles and
/// non-numbers have none.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn bits_of(v: &Value) -> Option<u64> {
    match v {
        Value::Int32(_) | Value::Int64(_) | Value::Double(_) => whole_number(v).ok().map(|n| n as u64),
        _ => None,
    }
}

/// Compiled `$regex`, compared by source and options.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    options: String,
    re: Regex,
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.options == other.options
    }
}

impl Pattern {
    /// Builds a pattern with the `i`, `m`, `s` and `x` options.
    ///
    /// # Errors
    /// `BadValue` for an unknown option or a pattern that fails to compile.
    pub fn new(source: &str, options: &str) -> Result<Self, DbError> {
        let mut builder = RegexBuilder::new(source);
        for flag in options.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                other => {
                    return Err(DbError::bad_value("$options", format!("invalid flag in regex options: {other}")));
                }
            };
        }
        let re = builder.build().map_err(|e| DbError::bad_value("$regex", e.to_string()))?;
        Ok(Self { source: source.to_owned(), options: options.to_owned(), re })
    }

    /// Reads `$regex` and its sibling `$options` from an operator document.
    ///
    /// # Errors
    /// `BadValue` when either is not a string, otherwise as [`Pattern::new`].
    pub fn from_operands(regex: &Value, options: Option<&Value>) -> Result<Self, DbError> {
        let Value::String(source) = regex else {
            return Err(DbError::bad_value("$regex", "$regex has to be a string"));
        };
        let options = match options {
            None => "",
            Some(Value::String(o)) => o.as_str(),
            Some(_) => return Err(DbError::bad_value("$options", "$options has to be a string")),
        };
        Self::new(source, options)
    }

    /// Only strings match.
    #[must_use]
    pub fn matches(&self, v: &Value) -> bool {
        matches!(v, Value::String(s) if self.re.is_match(s))
    }
}
