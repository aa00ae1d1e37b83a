//! Conversions between the value model and `bson` / `serde_json`.

use bson::spec::BinarySubtype;
use bson::{Bson, DateTime};
use bson::oid::ObjectId;

use crate::errors::DbError;

use super::doc::Document;
use super::value::{Binary, Value};

impl TryFrom<Bson> for Value {
    type Error = DbError;

    fn try_from(b: Bson) -> Result<Self, Self::Error> {
        Ok(match b {
            Bson::MinKey => Self::MinKey,
            Bson::MaxKey => Self::MaxKey,
            Bson::Null | Bson::Undefined => Self::Null,
            Bson::Boolean(v) => Self::Bool(v),
            Bson::Int32(v) => Self::Int32(v),
            Bson::Int64(v) => Self::Int64(v),
            Bson::Double(v) => Self::Double(v),
            Bson::String(v) => Self::String(v),
            Bson::Binary(bin) => Self::Binary(Binary { subtype: u8::from(bin.subtype), bytes: bin.bytes }),
            Bson::DateTime(dt) => Self::DateTime(dt),
            Bson::ObjectId(oid) => Self::ObjectId(oid),
            Bson::Document(d) => Self::Document(Document::try_from(d)?),
            Bson::Array(items) => {
                Self::Array(items.into_iter().map(Self::try_from).collect::<Result<_, _>>()?)
            }
            other => {
                return Err(DbError::Conversion(format!(
                    "unsupported BSON type {:?}",
                    other.element_type()
                )));
            }
        })
    }
}

impl From<Value> for Bson {
    fn from(v: Value) -> Self {
        match v {
            Value::MinKey => Self::MinKey,
            Value::MaxKey => Self::MaxKey,
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Boolean(b),
            Value::Int32(i) => Self::Int32(i),
            Value::Int64(i) => Self::Int64(i),
            Value::Double(d) => Self::Double(d),
            Value::String(s) => Self::String(s),
            Value::Binary(b) => Self::Binary(bson::Binary {
                subtype: BinarySubtype::from(b.subtype),
                bytes: b.bytes,
            }),
            Value::DateTime(dt) => Self::DateTime(dt),
            Value::ObjectId(oid) => Self::ObjectId(oid),
            Value::Document(d) => Self::Document(bson::Document::from(d)),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
        }
    }
}

impl TryFrom<bson::Document> for Document {
    type Error = DbError;

    fn try_from(d: bson::Document) -> Result<Self, Self::Error> {
        let mut out = Self::with_capacity(d.len());
        for (k, v) in d {
            out.insert(k, Value::try_from(v)?);
        }
        Ok(out)
    }
}

impl From<Document> for bson::Document {
    fn from(d: Document) -> Self {
        let mut out = Self::new();
        for (k, v) in d {
            out.insert(k, Bson::from(v));
        }
        out
    }
}

impl Value {
    /// Builds a value from JSON, honouring the relaxed extended-JSON wrappers
    /// `$oid`, `$date`, `$minKey` and `$maxKey`.
    ///
    /// # Errors
    /// Returns `Conversion` for malformed wrappers.
    pub fn from_json(json: serde_json::Value) -> Result<Self, DbError> {
        use serde_json::Value as J;
        Ok(match json {
            J::Null => Self::Null,
            J::Bool(b) => Self::Bool(b),
            J::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i32::try_from(i).map_or(Self::Int64(i), Self::Int32)
                } else {
                    Self::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            J::String(s) => Self::String(s),
            J::Array(items) => {
                Self::Array(items.into_iter().map(Self::from_json).collect::<Result<_, _>>()?)
            }
            J::Object(map) => {
                if map.len() == 1 {
                    if let Some(wrapped) = extended_json(&map)? {
                        return Ok(wrapped);
                    }
                }
                let mut doc = Document::with_capacity(map.len());
                for (k, v) in map {
                    doc.insert(k, Self::from_json(v)?);
                }
                Self::Document(doc)
            }
        })
    }
}

fn extended_json(map: &serde_json::Map<String, serde_json::Value>) -> Result<Option<Value>, DbError> {
    use serde_json::Value as J;
    let Some((key, val)) = map.iter().next() else {
        return Ok(None);
    };
    match (key.as_str(), val) {
        ("$oid", J::String(hex)) => ObjectId::parse_str(hex)
            .map(|oid| Some(Value::ObjectId(oid)))
            .map_err(|e| DbError::Conversion(format!("invalid $oid '{hex}': {e}"))),
        ("$date", J::Number(n)) => n
            .as_i64()
            .map(|ms| Some(Value::DateTime(DateTime::from_millis(ms))))
            .ok_or_else(|| DbError::Conversion(format!("invalid $date {n}"))),
        ("$minKey", _) => Ok(Some(Value::MinKey)),
        ("$maxKey", _) => Ok(Some(Value::MaxKey)),
        _ => Ok(None),
    }
}

/// Parses a JSON object into a [`Document`].
///
/// # Errors
/// Returns an error if the input is not valid JSON or not a JSON object.
pub fn parse_document_json(json: &str) -> Result<Document, DbError> {
    let raw: serde_json::Value = serde_json::from_str(json)?;
    match Value::from_json(raw)? {
        Value::Document(d) => Ok(d),
        other => Err(DbError::Conversion(format!("expected a JSON object, got {}", other.type_name()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bson_round_trip_preserves_cases() {
        let src = bson::doc! {
            "_id": ObjectId::new(),
            "i": 1,
            "l": 5_000_000_000_i64,
            "d": 1.5,
            "s": "x",
            "arr": [1, "two"],
            "sub": { "n": Bson::Null },
        };
        let doc = Document::try_from(src.clone()).unwrap();
        assert_eq!(doc.get("i"), Some(&Value::Int32(1)));
        assert_eq!(doc.get("l"), Some(&Value::Int64(5_000_000_000)));
        assert_eq!(bson::Document::from(doc), src);
    }

    #[test]
    fn unsupported_bson_is_rejected() {
        let src = bson::doc! { "ts": Bson::Timestamp(bson::Timestamp { time: 1, increment: 1 }) };
        assert!(matches!(Document::try_from(src), Err(DbError::Conversion(_))));
    }

    #[test]
    fn json_numbers_pick_narrowest_integer() {
        let doc = parse_document_json(r#"{"a": 1, "b": 5000000000, "c": 1.5, "d": {"$oid": "0123456789abcdef01234567"}}"#)
            .unwrap();
        assert_eq!(doc.get("a"), Some(&Value::Int32(1)));
        assert_eq!(doc.get("b"), Some(&Value::Int64(5_000_000_000)));
        assert_eq!(doc.get("c"), Some(&Value::Double(1.5)));
        assert!(matches!(doc.get("d"), Some(Value::ObjectId(_))));
        assert!(parse_document_json("[1]").is_err());
    }
}
