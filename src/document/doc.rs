use std::fmt;

use super::value::Value;

/// Ordered string-keyed mapping.
///
/// Keys are unique; insertion order is preserved and observable. Inserting an
/// existing key overwrites the value in place, so construction from pairs is
/// last-write-wins without reordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: Vec<(String, Value)>,
}

impl Document {
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    #[must_use]
    pub fn with_capacity(n: usize) -> Self {
        Self { fields: Vec::with_capacity(n) }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the value for `key`, or `None` when the field is absent.
    /// An absent field is distinct from a present `Value::Null`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    /// Inserts or overwrites `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.get_mut(&key) {
            return Some(std::mem::replace(slot, value));
        }
        self.fields.push((key, value));
        None
    }

    /// Inserts `key` as the first field, removing any existing entry for it.
    pub fn insert_first(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        self.remove(&key);
        self.fields.insert(0, (key, value.into()));
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(pos).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keeps only the fields for which `f` returns true.
    pub fn retain(&mut self, mut f: impl FnMut(&str, &Value) -> bool) {
        self.fields.retain(|(k, v)| f(k, v));
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut doc = Self::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_is_last_write_wins_without_reordering() {
        let doc: Document = vec![
            ("a".to_string(), Value::Int32(1)),
            ("b".to_string(), Value::Int32(2)),
            ("a".to_string(), Value::Int32(3)),
        ]
        .into_iter()
        .collect();
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(doc.get("a"), Some(&Value::Int32(3)));
    }

    #[test]
    fn absent_is_not_null() {
        let mut doc = Document::new();
        doc.insert("n", Value::Null);
        assert_eq!(doc.get("n"), Some(&Value::Null));
        assert_eq!(doc.get("missing"), None);
    }

    #[test]
    fn clone_is_independent() {
        let mut inner = Document::new();
        inner.insert("x", 1);
        let mut doc = Document::new();
        doc.insert("inner", inner);
        let copy = doc.clone();
        if let Some(Value::Document(d)) = doc.get_mut("inner") {
            d.insert("x", 2);
        }
        assert_eq!(copy.get("inner").and_then(Value::as_document).and_then(|d| d.get("x")), Some(&Value::Int32(1)));
    }

    #[test]
    fn insert_first_moves_key_to_front() {
        let mut doc = Document::new();
        doc.insert("a", 1);
        doc.insert("_id", 2);
        doc.insert_first("_id", 3);
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["_id", "a"]);
        assert_eq!(doc.get("_id"), Some(&Value::Int32(3)));
    }
}
