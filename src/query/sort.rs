use std::cmp::Ordering;

use crate::document::{Document, Path, Value};
use crate::errors::DbError;
use crate::utils::num::whole_number;

use super::compare::compare_for_sort;
use super::types::{Order, SortKey};

fn sort_order_error(key: &str, v: &Value) -> DbError {
    DbError::bad_value(
        key,
        format!("$sort key ordering must be 1 (for ascending) or -1 (for descending), got {key}: {v}"),
    )
}

/// Parses a sort document (`{field: 1, other: -1}`) into ordered keys.
///
/// # Errors
/// - `SortKeyLimitExceeded` with more than `max_keys` keys.
/// - `BadValue` for an empty field name, a path segment starting with `$`, or a
///   direction other than 1/-1.
pub fn parse_sort(spec: &Document, max_keys: usize, max_depth: usize) -> Result<Vec<SortKey>, DbError> {
    if spec.len() > max_keys {
        return Err(DbError::SortKeyLimitExceeded { count: spec.len(), max: max_keys });
    }
    let mut keys = Vec::with_capacity(spec.len());
    for (field, dir) in spec.iter() {
        if field.is_empty() {
            return Err(DbError::bad_value(field, "FieldPath cannot be constructed with empty string"));
        }
        if field.split('.').any(|seg| seg.starts_with('$')) {
            return Err(DbError::bad_value(field, format!("FieldPath field names may not start with '$'. Found: {field}")));
        }
        let order = match whole_number(dir) {
            Ok(1) => Order::Asc,
            Ok(-1) => Order::Desc,
            _ => return Err(sort_order_error(field, dir)),
        };
        keys.push(SortKey { path: Path::parse_with_depth(field, max_depth)?, order });
    }
    Ok(keys)
}

/// Lexicographic comparison of two documents on `keys`.
#[must_use]
pub fn compare_docs(a: &Document, b: &Document, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let o = compare_for_sort(a.get_by_path(&key.path), b.get_by_path(&key.path), key.order);
        if o != Ordering::Equal {
            return o;
        }
    }
    Ordering::Equal
}

/// Stable multi-key sort. Documents that tie on every key keep their
/// relative order.
pub fn sort_documents(docs: &mut [Document], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    docs.sort_by(|a, b| compare_docs(a, b, keys));
}

/// Stable sort of bare values with the same comparator as [`sort_documents`].
pub fn sort_values(values: &mut [Value], order: Order) {
    values.sort_by(|a, b| compare_for_sort(Some(a), Some(b), order));
}
