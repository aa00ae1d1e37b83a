use std::fmt;

use bson::DateTime;
use bson::oid::ObjectId;

use super::doc::Document;

/// Binary payload with its BSON subtype tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binary {
    pub subtype: u8,
    pub bytes: Vec<u8>,
}

/// The closed set of values a document may hold.
///
/// No coercion is stored: an `Int32(2)` stays an `Int32` even though it orders
/// equal to `Double(2.0)`. Consumers match exhaustively so adding a case is a
/// compile-time review of every comparator, matcher and arithmetic function.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    MinKey,
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    String(String),
    Binary(Binary),
    DateTime(DateTime),
    ObjectId(ObjectId),
    Document(Document),
    Array(Vec<Value>),
    MaxKey,
}

impl Value {
    /// MongoDB type alias, as used in `$type` and error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::MinKey => "minKey",
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int32(_) => "int",
            Self::Int64(_) => "long",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Binary(_) => "binData",
            Self::DateTime(_) => "date",
            Self::ObjectId(_) => "objectId",
            Self::Document(_) => "object",
            Self::Array(_) => "array",
            Self::MaxKey => "maxKey",
        }
    }

    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self, Self::Int32(_) | Self::Int64(_) | Self::Double(_))
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Document(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Strict structural identity: same case, same payload, same key order.
    ///
    /// Unlike `==`, two NaN doubles are identical. `Int32(1)` and `Int64(1)` are not.
    #[must_use]
    pub fn identical(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Double(a), Self::Double(b)) => (a.is_nan() && b.is_nan()) || a == b,
            (Self::Document(a), Self::Document(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|((ka, va), (kb, vb))| ka == kb && va.identical(vb))
            }
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.identical(y))
            }
            _ => self == other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinKey => f.write_str("MinKey"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int32(i) => write!(f, "{i}"),
            Self::Int64(i) => write!(f, "{i}"),
            Self::Double(d) => {
                if d.is_finite() && d.fract() == 0.0 {
                    write!(f, "{d:.1}")
                } else {
                    write!(f, "{d}")
                }
            }
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Binary(b) => write!(f, "BinData({}, {} bytes)", b.subtype, b.bytes.len()),
            Self::DateTime(dt) => write!(f, "new Date({})", dt.timestamp_millis()),
            Self::ObjectId(oid) => write!(f, "ObjectId('{}')", oid.to_hex()),
            Self::Document(d) => write!(f, "{d}"),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            Self::MaxKey => f.write_str("MaxKey"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Document> for Value {
    fn from(v: Document) -> Self {
        Self::Document(v)
    }
}

impl From<Vec<Self>> for Value {
    fn from(v: Vec<Self>) -> Self {
        Self::Array(v)
    }
}

impl From<ObjectId> for Value {
    fn from(v: ObjectId) -> Self {
        Self::ObjectId(v)
    }
}

impl From<DateTime> for Value {
    fn from(v: DateTime) -> Self {
        Self::DateTime(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_distinguishes_numeric_representations() {
        assert!(!Value::Int32(1).identical(&Value::Int64(1)));
        assert!(Value::Double(f64::NAN).identical(&Value::Double(f64::NAN)));
        assert_ne!(Value::Double(f64::NAN), Value::Double(f64::NAN));
    }

    #[test]
    fn display_renders_shell_like_text() {
        let v = Value::Array(vec![Value::Int32(1), Value::from("a"), Value::Double(2.0)]);
        assert_eq!(v.to_string(), "[1, \"a\", 2.0]");
    }
}
