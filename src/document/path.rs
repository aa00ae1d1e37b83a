use std::fmt;

use crate::errors::DbError;

use super::doc::Document;
use super::value::Value;

/// Upper bound on dotted-path depth accepted by [`Path::parse`].
pub const MAX_PATH_DEPTH: usize = 32;

/// Most `Null` slots a single array-index write may append.
pub const MAX_ARRAY_BACKFILL: usize = 1_500_000;

/// A dotted field path such as `a.b.0.c`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// # Errors
    /// Returns `BadValue` for an empty path, an empty segment, or a path deeper
    /// than [`MAX_PATH_DEPTH`].
    pub fn parse(s: &str) -> Result<Self, DbError> {
        Self::parse_with_depth(s, MAX_PATH_DEPTH)
    }

    /// # Errors
    /// Same as [`Path::parse`] with a caller-supplied depth bound.
    pub fn parse_with_depth(s: &str, max_depth: usize) -> Result<Self, DbError> {
        if s.is_empty() {
            return Err(DbError::bad_value(s, "An empty update path is not valid."));
        }
        let segments: Vec<String> = s.split('.').map(str::to_owned).collect();
        if segments.iter().any(String::is_empty) {
            return Err(DbError::bad_value(
                s,
                format!("The path '{s}' contains an empty field name, which is not allowed."),
            ));
        }
        if segments.len() > max_depth {
            return Err(DbError::bad_value(
                s,
                format!("path '{s}' exceeds the maximum depth of {max_depth}"),
            ));
        }
        Ok(Self { segments })
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Top-level field name.
    #[must_use]
    pub fn root(&self) -> &str {
        self.segments.first().map_or("", String::as_str)
    }

    /// Last segment, used in diagnostics for nested fields.
    #[must_use]
    pub fn suffix(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// True when `self` equals `other` or is one of its ancestors.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.segments.len() <= other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

pub(crate) fn array_index(seg: &str) -> Option<usize> {
    if seg.is_empty() || !seg.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    seg.parse().ok()
}

fn cannot_create(path: &Path, seg: &str, parent: &str, holder: &Value) -> DbError {
    DbError::type_mismatch(
        path.to_string(),
        format!("Cannot create field '{seg}' in element {{{parent}: {holder}}}"),
    )
}

impl Document {
    /// Resolves `path` through nested documents and array indexes.
    #[must_use]
    pub fn get_by_path(&self, path: &Path) -> Option<&Value> {
        let (first, rest) = path.segments.split_first()?;
        let mut cur = self.get(first)?;
        for seg in rest {
            cur = match cur {
                Value::Document(d) => d.get(seg)?,
                Value::Array(items) => items.get(array_index(seg)?)?,
                _ => return None,
            };
        }
        Some(cur)
    }

    #[must_use]
    pub fn has_by_path(&self, path: &Path) -> bool {
        self.get_by_path(path).is_some()
    }

    /// Sets `value` at `path`, creating intermediate documents as needed.
    ///
    /// Arrays are descended by numeric index and padded with `Null` when the
    /// index is past the end.
    ///
    /// # Errors
    /// Returns `TypeMismatch` when an intermediate segment holds a scalar, or
    /// when a non-numeric segment addresses an array.
    pub fn set_by_path(&mut self, path: &Path, value: Value) -> Result<(), DbError> {
        set_in_document(self, &path.segments, value, path)
    }

    /// Removes the value at `path`. Array elements are replaced by `Null`
    /// rather than shifted.
    pub fn remove_by_path(&mut self, path: &Path) -> Option<Value> {
        let (last, parents) = path.segments.split_last()?;
        let Some((first, rest)) = parents.split_first() else {
            return self.remove(last);
        };
        let mut cur = self.get_mut(first)?;
        for seg in rest {
            cur = match cur {
                Value::Document(d) => d.get_mut(seg)?,
                Value::Array(items) => items.get_mut(array_index(seg)?)?,
                _ => return None,
            };
        }
        match cur {
            Value::Document(d) => d.remove(last),
            Value::Array(items) => {
                let slot = items.get_mut(array_index(last)?)?;
                Some(std::mem::replace(slot, Value::Null))
            }
            _ => None,
        }
    }
}

fn set_in_document(doc: &mut Document, segs: &[String], value: Value, path: &Path) -> Result<(), DbError> {
    let Some((head, rest)) = segs.split_first() else {
        return Ok(());
    };
    if rest.is_empty() {
        doc.insert(head.clone(), value);
        return Ok(());
    }
    if let Some(child) = doc.get_mut(head) {
        return set_in_value(child, head, rest, value, path);
    }
    let mut child = Document::new();
    set_in_document(&mut child, rest, value, path)?;
    doc.insert(head.clone(), Value::Document(child));
    Ok(())
}

fn set_in_value(
    holder: &mut Value,
    holder_key: &str,
    segs: &[String],
    value: Value,
    path: &Path,
) -> Result<(), DbError> {
    match holder {
        Value::Document(d) => set_in_document(d, segs, value, path),
        Value::Array(items) => {
            let Some((head, rest)) = segs.split_first() else {
                return Ok(());
            };
            let Some(idx) = array_index(head) else {
                return Err(cannot_create(path, head, holder_key, &Value::Array(items.clone())));
            };
            if idx.saturating_sub(items.len()) > MAX_ARRAY_BACKFILL {
                return Err(DbError::bad_value(
                    path.to_string(),
                    format!("can't backfill more than {MAX_ARRAY_BACKFILL} elements"),
                ));
            }
            if items.len() <= idx {
                items.resize(idx + 1, Value::Null);
            }
            if rest.is_empty() {
                items[idx] = value;
                return Ok(());
            }
            if items[idx].is_null() {
                items[idx] = Value::Document(Document::new());
            }
            set_in_value(&mut items[idx], head, rest, value, path)
        }
        other => {
            let seg = segs.first().map_or("", String::as_str);
            Err(cannot_create(path, seg, holder_key, other))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[test]
    fn parse_rejects_empty_segments() {
        assert!(Path::parse("").is_err());
        assert!(Path::parse("a..b").is_err());
        assert!(Path::parse(".a").is_err());
        assert_eq!(p("a.b.c").len(), 3);
    }

    #[test]
    fn parse_enforces_depth() {
        let deep = vec!["x"; MAX_PATH_DEPTH + 1].join(".");
        assert!(Path::parse(&deep).is_err());
        assert!(Path::parse_with_depth(&deep, MAX_PATH_DEPTH + 1).is_ok());
    }

    #[test]
    fn set_creates_intermediate_documents() {
        let mut doc = Document::new();
        doc.set_by_path(&p("a.b.c"), Value::Int32(1)).unwrap();
        assert_eq!(doc.get_by_path(&p("a.b.c")), Some(&Value::Int32(1)));
    }

    #[test]
    fn set_through_scalar_fails() {
        let mut doc = Document::new();
        doc.insert("a", 5);
        let err = doc.set_by_path(&p("a.b"), Value::Int32(1)).unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch { .. }));
        assert_eq!(doc.get("a"), Some(&Value::Int32(5)));
    }

    #[test]
    fn set_pads_arrays_with_null() {
        let mut doc = Document::new();
        doc.insert("a", Value::Array(vec![Value::Int32(1)]));
        doc.set_by_path(&p("a.3"), Value::Int32(4)).unwrap();
        assert_eq!(
            doc.get("a"),
            Some(&Value::Array(vec![Value::Int32(1), Value::Null, Value::Null, Value::Int32(4)]))
        );
        let err = doc.set_by_path(&p("a.x"), Value::Int32(1)).unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch { .. }));
    }

    #[test]
    fn set_refuses_huge_backfill() {
        let mut doc = Document::new();
        doc.insert("a", Value::Array(Vec::new()));
        let err = doc.set_by_path(&p("a.3000000"), Value::Int32(1)).unwrap_err();
        assert!(matches!(err, DbError::BadValue { .. }));
        let err = doc.set_by_path(&p("a.18446744073709551615"), Value::Int32(1)).unwrap_err();
        assert!(matches!(err, DbError::BadValue { .. }));
        assert_eq!(doc.get("a"), Some(&Value::Array(Vec::new())));

        doc.set_by_path(&p(&format!("a.{MAX_ARRAY_BACKFILL}")), Value::Int32(1)).unwrap();
        assert_eq!(doc.get("a").and_then(Value::as_array).map(<[Value]>::len), Some(MAX_ARRAY_BACKFILL + 1));
    }

    #[test]
    fn remove_by_path_nested_and_array() {
        let mut inner = Document::new();
        inner.insert("b", 1);
        inner.insert("c", 2);
        let mut doc = Document::new();
        doc.insert("a", inner);
        doc.insert("arr", Value::Array(vec![Value::Int32(1), Value::Int32(2)]));
        assert_eq!(doc.remove_by_path(&p("a.b")), Some(Value::Int32(1)));
        assert!(!doc.has_by_path(&p("a.b")));
        assert!(doc.has_by_path(&p("a.c")));
        assert_eq!(doc.remove_by_path(&p("arr.0")), Some(Value::Int32(1)));
        assert_eq!(doc.get("arr"), Some(&Value::Array(vec![Value::Null, Value::Int32(2)])));
        assert_eq!(doc.remove_by_path(&p("nope.x")), None);
    }

    #[test]
    fn prefix_relation() {
        assert!(p("a").is_prefix_of(&p("a.b")));
        assert!(p("a.b").is_prefix_of(&p("a.b")));
        assert!(!p("a.b").is_prefix_of(&p("a")));
        assert!(!p("ab").is_prefix_of(&p("a.b")));
    }
}
