use crate::document::{Document, ID_FIELD, ObjectId, Path, Value};
use crate::errors::DbError;

use super::ops::{UpdateContext, apply_update};
use super::types::UpdateSpec;

fn is_operator_doc(v: &Value) -> bool {
    v.as_document().and_then(|d| d.keys().next()).is_some_and(|k| k.starts_with('$'))
}

/// Identifier for a document created by an upsert: the filter's literal
/// `_id` when it has one, otherwise a fresh `ObjectId`. An `_id` clause that
/// holds a query operator is never echoed back.
#[must_use]
pub fn upsert_id(filter: &Document) -> Value {
    match filter.get(ID_FIELD) {
        Some(Value::Document(d)) if d.len() == 1 && d.contains_key("$eq") => {
            d.get("$eq").cloned().unwrap_or_else(|| Value::ObjectId(ObjectId::new()))
        }
        Some(v) if !is_operator_doc(v) => v.clone(),
        _ => Value::ObjectId(ObjectId::new()),
    }
}

/// Equality-style fields of a filter: literal values, `{$eq: v}` and the
/// contents of `$and` branches. Other operators contribute nothing.
fn seed_from_filter(filter: &Document, out: &mut Document, max_depth: usize) -> Result<(), DbError> {
    for (key, value) in filter.iter() {
        if key == "$and" {
            for branch in value.as_array().unwrap_or_default() {
                if let Value::Document(sub) = branch {
                    seed_from_filter(sub, out, max_depth)?;
                }
            }
            continue;
        }
        if key.starts_with('$') || key == ID_FIELD {
            continue;
        }
        let literal = match value {
            Value::Document(d) if is_operator_doc(value) => match d.get("$eq") {
                Some(v) if d.len() == 1 => v.clone(),
                _ => continue,
            },
            v => v.clone(),
        };
        out.set_by_path(&Path::parse_with_depth(key, max_depth)?, literal)?;
    }
    Ok(())
}

/// Builds the document inserted when an upsert matched nothing.
///
/// Operator updates run against a document seeded from the filter with
/// `ctx.is_insert` set. Replacements are taken as-is. In both cases `_id`
/// comes first and, when absent, is filled by [`upsert_id`].
///
/// # Errors
/// Any update error, or `ImmutableField` if the update contradicts a literal
/// `_id` in the filter.
pub fn build_upsert_document(filter: &Document, spec: &UpdateSpec, ctx: &UpdateContext) -> Result<Document, DbError> {
    let filter_id = filter.get(ID_FIELD).filter(|v| !is_operator_doc(v)).map(|_| upsert_id(filter));
    let mut seed = Document::new();
    if let Some(id) = filter_id {
        seed.insert(ID_FIELD, id);
    }
    let mut doc = match spec {
        UpdateSpec::Replacement(_) => apply_update(&seed, spec, ctx)?.doc,
        UpdateSpec::Operators(_) => {
            seed_from_filter(filter, &mut seed, ctx.max_path_depth)?;
            apply_update(&seed, spec, &ctx.for_insert())?.doc
        }
    };
    let id = doc.remove(ID_FIELD).unwrap_or_else(|| upsert_id(filter));
    doc.insert_first(ID_FIELD, id);
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_document_json;

    fn build(filter: &str, update: &str) -> Result<Document, DbError> {
        let spec = UpdateSpec::parse(&parse_document_json(update).unwrap())?;
        build_upsert_document(&parse_document_json(filter).unwrap(), &spec, &UpdateContext::default())
    }

    #[test]
    fn literal_id_is_reused() {
        let doc = build(r#"{"_id": 5, "a": 1}"#, r#"{"$set": {"b": 2}}"#).unwrap();
        assert_eq!(doc.to_string(), "{_id: 5, a: 1, b: 2}");
    }

    #[test]
    fn operator_id_generates_object_id() {
        let doc = build(r#"{"_id": {"$gt": 5}}"#, r#"{"$set": {"b": 2}}"#).unwrap();
        assert!(matches!(doc.get(ID_FIELD), Some(Value::ObjectId(_))));
        assert_eq!(doc.keys().next(), Some(ID_FIELD));
    }

    #[test]
    fn eq_and_and_branches_seed_fields() {
        let doc = build(r#"{"a": {"$eq": 1}, "$and": [{"b.c": 2}], "d": {"$gt": 3}}"#, r#"{"$inc": {"n": 1}}"#).unwrap();
        assert_eq!(doc.get("a"), Some(&Value::Int32(1)));
        assert_eq!(doc.get_by_path(&Path::parse("b.c").unwrap()), Some(&Value::Int32(2)));
        assert!(!doc.contains_key("d"));
        assert_eq!(doc.get("n"), Some(&Value::Int32(1)));
    }

    #[test]
    fn set_on_insert_applies() {
        let doc = build(r#"{"a": 1}"#, r#"{"$setOnInsert": {"created": true}}"#).unwrap();
        assert_eq!(doc.get("created"), Some(&Value::Bool(true)));
    }

    #[test]
    fn replacement_upsert_takes_filter_id() {
        let doc = build(r#"{"_id": 9, "x": 1}"#, r#"{"y": 2}"#).unwrap();
        assert_eq!(doc.to_string(), "{_id: 9, y: 2}");
        let err = build(r#"{"_id": 9}"#, r#"{"_id": 10}"#).unwrap_err();
        assert!(matches!(err, DbError::ImmutableField { .. }));
    }

    #[test]
    fn conflicting_id_update_is_rejected() {
        let err = build(r#"{"_id": 1}"#, r#"{"$set": {"_id": 2}}"#).unwrap_err();
        assert!(matches!(err, DbError::ImmutableField { .. }));
    }
}
