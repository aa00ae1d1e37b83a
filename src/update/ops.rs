//! Application of update operators and replacements.
//!
//! Every update works on a deep copy; the input document is only replaced
//! once the whole update document has applied cleanly.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::document::{self, Document, ID_FIELD, Path, Value};
use crate::errors::DbError;
use crate::query::compare::compare;
use crate::query::eval::matches_value;
use crate::query::filter::FilterTree;
use crate::utils::num::whole_i32;

use super::arith::{self, ArithError};
use super::types::{UpdateKind, UpdateOp, UpdateSpec};

/// Inputs that are not part of the update document itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateContext {
    /// Timestamp written by `$currentDate`.
    pub now: DateTime<Utc>,
    /// Set when the document is being created by an upsert; enables `$setOnInsert`.
    pub is_insert: bool,
    /// Depth limit for paths inside operands, such as `$pull` conditions.
    pub max_path_depth: usize,
}

impl Default for UpdateContext {
    fn default() -> Self {
        Self::at(Utc::now())
    }
}

impl UpdateContext {
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now, is_insert: false, max_path_depth: document::MAX_PATH_DEPTH }
    }

    #[must_use]
    pub const fn for_insert(self) -> Self {
        Self { is_insert: true, ..self }
    }

    #[must_use]
    pub const fn with_path_depth(self, max_path_depth: usize) -> Self {
        Self { max_path_depth, ..self }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub doc: Document,
    pub changed: bool,
}

/// Applies `spec` to a copy of `doc`.
///
/// # Errors
/// Any operator error; `doc` is never modified.
pub fn apply_update(doc: &Document, spec: &UpdateSpec, ctx: &UpdateContext) -> Result<UpdateOutcome, DbError> {
    let out = match spec {
        UpdateSpec::Replacement(replacement) => replace(doc, replacement)?,
        UpdateSpec::Operators(ops) => {
            let mut work = doc.clone();
            let mut changed = false;
            for op in ops {
                changed |= apply_op(&mut work, op, ctx)?;
            }
            check_id_unchanged(doc, &work)?;
            UpdateOutcome { doc: work, changed }
        }
    };
    Ok(out)
}

/// Applies `spec` to `doc` in place, all-or-nothing. Returns whether the
/// document changed.
///
/// # Errors
/// See [`apply_update`]; on error `doc` is left untouched.
pub fn apply_update_in_place(doc: &mut Document, spec: &UpdateSpec, ctx: &UpdateContext) -> Result<bool, DbError> {
    let out = apply_update(doc, spec, ctx)?;
    *doc = out.doc;
    Ok(out.changed)
}

fn replace(doc: &Document, replacement: &Document) -> Result<UpdateOutcome, DbError> {
    let mut next = replacement.clone();
    if let Some(id) = doc.get(ID_FIELD) {
        match next.get(ID_FIELD) {
            Some(new_id) if !new_id.identical(id) => {
                return Err(immutable_id(id, new_id));
            }
            _ => next.insert_first(ID_FIELD, id.clone()),
        }
    }
    let changed = doc.len() != next.len()
        || doc.iter().zip(next.iter()).any(|((ka, va), (kb, vb))| ka != kb || !va.identical(vb));
    Ok(UpdateOutcome { doc: next, changed })
}

fn immutable_id(old: &Value, new: &Value) -> DbError {
    DbError::immutable_field(
        ID_FIELD,
        format!("Performing an update on the path '_id' would modify the immutable field '_id' ({old} -> {new})"),
    )
}

fn check_id_unchanged(before: &Document, after: &Document) -> Result<(), DbError> {
    let Some(old) = before.get(ID_FIELD) else {
        return Ok(());
    };
    match after.get(ID_FIELD) {
        Some(new) if new.identical(old) => Ok(()),
        Some(new) => Err(immutable_id(old, new)),
        None => Err(immutable_id(old, &Value::Null)),
    }
}

fn doc_id(doc: &Document) -> String {
    doc.get(ID_FIELD).map_or_else(|| "{}".to_owned(), |id| format!("{{_id: {id}}}"))
}

fn set_if_different(doc: &mut Document, path: &Path, value: Value) -> Result<bool, DbError> {
    if doc.get_by_path(path).is_some_and(|prev| prev.identical(&value)) {
        return Ok(false);
    }
    doc.set_by_path(path, value)?;
    Ok(true)
}

fn apply_op(doc: &mut Document, op: &UpdateOp, ctx: &UpdateContext) -> Result<bool, DbError> {
    let path = &op.path;
    match op.kind {
        UpdateKind::Set => set_if_different(doc, path, op.operand.clone()),
        UpdateKind::SetOnInsert => {
            if ctx.is_insert { set_if_different(doc, path, op.operand.clone()) } else { Ok(false) }
        }
        UpdateKind::Unset => Ok(doc.remove_by_path(path).is_some()),
        UpdateKind::Inc | UpdateKind::Mul => arithmetic(doc, op),
        UpdateKind::Min | UpdateKind::Max => {
            let want = if op.kind == UpdateKind::Min { Ordering::Less } else { Ordering::Greater };
            if !doc.get_by_path(path).is_none_or(|prev| compare(&op.operand, prev) == want) {
                return Ok(false);
            }
            doc.set_by_path(path, op.operand.clone())?;
            Ok(true)
        }
        UpdateKind::Rename => {
            let Some(target) = &op.target else {
                return Ok(false);
            };
            let Some(v) = doc.get_by_path(path).cloned() else {
                return Ok(false);
            };
            doc.remove_by_path(path);
            doc.set_by_path(target, v)?;
            Ok(true)
        }
        UpdateKind::CurrentDate => current_date(doc, op, ctx),
        UpdateKind::Push | UpdateKind::AddToSet => push(doc, op),
        UpdateKind::Pop => pop(doc, op),
        UpdateKind::Pull | UpdateKind::PullAll => pull(doc, op, ctx),
        UpdateKind::Bit => bit(doc, op),
    }
}

fn arithmetic(doc: &mut Document, op: &UpdateOp) -> Result<bool, DbError> {
    let name = op.kind.name();
    let field = op.path.to_string();
    if !op.operand.is_number() {
        let verb = if op.kind == UpdateKind::Inc { "increment" } else { "multiply" };
        return Err(DbError::type_mismatch(
            &field,
            format!("Cannot {verb} with non-numeric argument: {{{field}: {}}}", op.operand),
        ));
    }
    let Some(prev) = doc.get_by_path(&op.path) else {
        let init = match (op.kind, &op.operand) {
            (UpdateKind::Inc, v) => v.clone(),
            (_, Value::Int32(_)) => Value::Int32(0),
            (_, Value::Int64(_)) => Value::Int64(0),
            _ => Value::Double(0.0),
        };
        doc.set_by_path(&op.path, init)?;
        return Ok(true);
    };
    let result = if op.kind == UpdateKind::Inc {
        arith::add(prev, &op.operand)
    } else {
        arith::multiply(prev, &op.operand)
    };
    let next = match result {
        Ok(v) => v,
        Err(ArithError::LeftOperand | ArithError::RightOperand) => {
            return Err(DbError::type_mismatch(
                &field,
                format!(
                    "Cannot apply {name} to a value of non-numeric type. {} has the field '{}' of non-numeric type {}",
                    doc_id(doc),
                    op.path.suffix(),
                    prev.type_name()
                ),
            ));
        }
        Err(ArithError::LongExceeded) => {
            return Err(DbError::LongExceeded {
                field,
                msg: format!("Failed to apply {name} operations to current value ({prev}) for document {}", doc_id(doc)),
            });
        }
    };
    if let Value::Double(d) = next
        && d.is_infinite()
        && op.kind == UpdateKind::Mul
    {
        return Err(DbError::Infinity { field, msg: format!("{name} produced an infinite result from {prev}") });
    }
    // Int32(0) -> Int64(0) and NaN -> NaN both count as modifications.
    let changed = *prev != next;
    doc.set_by_path(&op.path, next)?;
    Ok(changed)
}

fn current_date(doc: &mut Document, op: &UpdateOp, ctx: &UpdateContext) -> Result<bool, DbError> {
    let field = op.path.to_string();
    match &op.operand {
        Value::Bool(_) => {}
        Value::Document(spec) => match spec.get("$type").and_then(Value::as_str) {
            Some("date") => {}
            Some("timestamp") => {
                return Err(DbError::not_implemented(field, "$currentDate with $type timestamp is not supported"));
            }
            _ => {
                return Err(DbError::bad_value(
                    field,
                    "The '$type' string field is required to be 'date' or 'timestamp': {$currentDate: {field : {$type: 'date'}}}",
                ));
            }
        },
        other => {
            return Err(DbError::bad_value(
                field,
                format!("{} is not valid type for $currentDate. Please use a boolean ('true') or a $type expression ({{$type: 'timestamp/date'}}).", other.type_name()),
            ));
        }
    }
    let now = Value::DateTime(document::DateTime::from_millis(ctx.now.timestamp_millis()));
    set_if_different(doc, &op.path, now)
}

fn array_at<'a>(doc: &'a mut Document, op: &UpdateOp) -> Result<Option<&'a mut Vec<Value>>, DbError> {
    let id = doc_id(doc);
    let Some(slot) = doc.get_by_path(&op.path) else {
        return Ok(None);
    };
    if !matches!(slot, Value::Array(_)) {
        return Err(DbError::bad_value(
            op.path.to_string(),
            format!(
                "The field '{}' must be an array but is of type {} in document {id}",
                op.path,
                slot.type_name()
            ),
        ));
    }
    Ok(get_array_mut(doc, &op.path))
}

fn get_array_mut<'a>(doc: &'a mut Document, path: &Path) -> Option<&'a mut Vec<Value>> {
    let (first, rest) = path.segments().split_first()?;
    let mut cur = doc.get_mut(first)?;
    for seg in rest {
        cur = match cur {
            Value::Document(d) => d.get_mut(seg)?,
            Value::Array(items) => items.get_mut(document::array_index(seg)?)?,
            _ => return None,
        };
    }
    match cur {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

fn push(doc: &mut Document, op: &UpdateOp) -> Result<bool, DbError> {
    let name = op.kind.name();
    let values: Vec<Value> = match &op.operand {
        Value::Document(d) if d.contains_key("$each") => {
            if let Some(k) = d.keys().find(|k| *k != "$each") {
                return Err(DbError::not_implemented(op.path.to_string(), format!("{name} modifier {k} is not supported")));
            }
            match d.get("$each") {
                Some(Value::Array(items)) => items.clone(),
                Some(other) => {
                    return Err(DbError::bad_value(
                        op.path.to_string(),
                        format!("The argument to $each in {name} must be an array but it was of type: {}", other.type_name()),
                    ));
                }
                None => Vec::new(),
            }
        }
        v => vec![v.clone()],
    };
    let Some(items) = array_at(doc, op)? else {
        let mut fresh = Vec::with_capacity(values.len());
        for v in values {
            if op.kind == UpdateKind::Push || !fresh.iter().any(|e| compare(e, &v) == Ordering::Equal) {
                fresh.push(v);
            }
        }
        doc.set_by_path(&op.path, Value::Array(fresh))?;
        return Ok(true);
    };
    let mut changed = false;
    for v in values {
        if op.kind == UpdateKind::AddToSet && items.iter().any(|e| compare(e, &v) == Ordering::Equal) {
            continue;
        }
        items.push(v);
        changed = true;
    }
    Ok(changed)
}

fn pop(doc: &mut Document, op: &UpdateOp) -> Result<bool, DbError> {
    let field = op.path.to_string();
    let dir = whole_i32(&field, &op.operand)?;
    if dir != 1 && dir != -1 {
        return Err(DbError::bad_value(field, format!("$pop expects 1 or -1, found: {}", op.operand)));
    }
    let Some(items) = array_at(doc, op)? else {
        return Ok(false);
    };
    if items.is_empty() {
        return Ok(false);
    }
    if dir == 1 {
        items.pop();
    } else {
        items.remove(0);
    }
    Ok(true)
}

fn pull(doc: &mut Document, op: &UpdateOp, ctx: &UpdateContext) -> Result<bool, DbError> {
    let field = op.path.to_string();
    let keep: Box<dyn Fn(&Value) -> bool> = match (op.kind, &op.operand) {
        (UpdateKind::PullAll, Value::Array(targets)) => {
            let targets = targets.clone();
            Box::new(move |e: &Value| !targets.iter().any(|t| compare(e, t) == Ordering::Equal))
        }
        (UpdateKind::PullAll, other) => {
            return Err(DbError::bad_value(
                field,
                format!("$pullAll requires an array argument but was given a {}", other.type_name()),
            ));
        }
        (_, Value::Document(cond)) => {
            let tree = FilterTree::compile_element(cond, ctx.max_path_depth)?;
            Box::new(move |e: &Value| !matches_value(e, &tree))
        }
        (_, target) => {
            let target = target.clone();
            Box::new(move |e: &Value| compare(e, &target) != Ordering::Equal)
        }
    };
    let Some(items) = array_at(doc, op)? else {
        return Ok(false);
    };
    let before = items.len();
    items.retain(|e| keep(e));
    Ok(items.len() != before)
}

#[allow(clippy::cast_possible_truncation)]
fn bit(doc: &mut Document, op: &UpdateOp) -> Result<bool, DbError> {
    let field = op.path.to_string();
    let Value::Document(spec) = &op.operand else {
        return Err(DbError::bad_value(
            field,
            format!("The $bit modifier is not compatible with a {}. You must pass in an embedded document: {{$bit: {{field: {{and/or/xor: #}}}}", op.operand.type_name()),
        ));
    };
    let mut acc = match doc.get_by_path(&op.path) {
        None => Value::Int32(0),
        Some(v @ (Value::Int32(_) | Value::Int64(_))) => v.clone(),
        Some(v) => {
            return Err(DbError::bad_value(
                field,
                format!("Cannot apply $bit to a value of non-integral type. {} has the field {} of non-integer type {}", doc_id(doc), op.path.suffix(), v.type_name()),
            ));
        }
    };
    for (bitop, arg) in spec.iter() {
        acc = match (&acc, arg) {
            (Value::Int32(a), Value::Int32(b)) => Value::Int32(bitwise(bitop, i64::from(*a), i64::from(*b), &field)? as i32),
            (Value::Int32(a), Value::Int64(b)) => Value::Int64(bitwise(bitop, i64::from(*a), *b, &field)?),
            (Value::Int64(a), Value::Int32(b)) => Value::Int64(bitwise(bitop, *a, i64::from(*b), &field)?),
            (Value::Int64(a), Value::Int64(b)) => Value::Int64(bitwise(bitop, *a, *b, &field)?),
            (_, other) => {
                return Err(DbError::bad_value(
                    field,
                    format!("The $bit modifier field must be an Integer(32/64 bit); a '{}' is not supported here", other.type_name()),
                ));
            }
        };
    }
    let changed = doc.get_by_path(&op.path) != Some(&acc);
    doc.set_by_path(&op.path, acc)?;
    Ok(changed)
}

fn bitwise(op: &str, a: i64, b: i64, field: &str) -> Result<i64, DbError> {
    match op {
        "and" => Ok(a & b),
        "or" => Ok(a | b),
        "xor" => Ok(a ^ b),
        _ => Err(DbError::bad_value(
            field,
            format!("The $bit modifier only supports 'and', 'or', and 'xor', not '{op}' which is an unknown operator"),
        )),
    }
}
