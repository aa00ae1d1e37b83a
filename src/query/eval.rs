//! Filter evaluation.
//!
//! Structural matching of documents and arrays is strict: `Int32(1)` does not
//! equal `Int64(1)` inside a document or array operand. Scalar predicates use
//! numeric equivalence through [`compare_scalars`].

use crate::document::{Document, Path, Value, array_index};
use crate::errors::DbError;

use super::compare::{compare, compare_scalars};
use super::filter::{FilterTree, NodeId, NodeKind, Predicate};
use super::leaf::{bits_of, type_matches};
use super::types::{CmpOp, CompareResult};

/// Strict structural equality. Documents compare with order-independent keys.
#[must_use]
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Document(x), Value::Document(y)) => match_documents(x, y),
        (Value::Array(x), Value::Array(y)) => arrays_equal(x, y),
        _ => a.identical(b),
    }
}

/// Two documents match when they hold the same key set and every value is
/// strictly equal. Key order is ignored.
#[must_use]
pub fn match_documents(a: &Document, b: &Document) -> bool {
    a.len() == b.len()
        && a.iter().all(|(k, va)| b.get(k).is_some_and(|vb| values_equal(va, vb)))
}

fn arrays_equal(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
}

/// A filter array matches a document array equal to it, or one holding an
/// element that is an equal array.
#[must_use]
pub fn match_arrays(filter: &[Value], doc: &[Value]) -> bool {
    arrays_equal(filter, doc)
        || doc.iter().any(|e| matches!(e, Value::Array(inner) if arrays_equal(filter, inner)))
}

fn collect<'a>(v: &'a Value, segs: &[String], out: &mut Vec<&'a Value>) {
    let Some((head, rest)) = segs.split_first() else {
        out.push(v);
        return;
    };
    match v {
        Value::Document(d) => {
            if let Some(child) = d.get(head) {
                collect(child, rest, out);
            }
        }
        Value::Array(items) => {
            if let Some(child) = array_index(head).and_then(|i| items.get(i)) {
                collect(child, rest, out);
            }
            for item in items {
                if let Value::Document(d) = item
                    && let Some(child) = d.get(head)
                {
                    collect(child, rest, out);
                }
            }
        }
        _ => {}
    }
}

/// All values reachable at `path`, fanning out over arrays of documents.
/// An empty result means the field is absent.
#[must_use]
pub fn find_values<'a>(doc: &'a Document, path: &Path) -> Vec<&'a Value> {
    let mut out = Vec::new();
    if let Some((first, rest)) = path.segments().split_first()
        && let Some(v) = doc.get(first)
    {
        collect(v, rest, &mut out);
    }
    out
}

fn eq_matches(candidate: &Value, target: &Value) -> bool {
    match (target, candidate) {
        (Value::Array(t), Value::Array(c)) => match_arrays(t, c),
        (Value::Array(_), _) => false,
        (Value::Document(t), Value::Document(c)) => match_documents(t, c),
        (Value::Document(t), Value::Array(c)) => {
            c.iter().any(|e| matches!(e, Value::Document(d) if match_documents(t, d)))
        }
        (Value::Document(_), _) => false,
        (_, Value::Array(c)) => c.iter().any(|e| compare_scalars(e, target) == CompareResult::Equal),
        _ => compare_scalars(candidate, target) == CompareResult::Equal,
    }
}

fn eq_any(vals: &[&Value], target: &Value) -> bool {
    (target.is_null() && vals.is_empty()) || vals.iter().any(|v| eq_matches(v, target))
}

fn cmp_matches(candidate: &Value, op: CmpOp, target: &Value) -> bool {
    match candidate {
        Value::Array(items) => {
            items.iter().any(|e| op.accepts(compare_scalars(e, target)))
                || (matches!(target, Value::Array(_)) && op.accepts(compare(candidate, target).into()))
        }
        _ => op.accepts(compare_scalars(candidate, target)),
    }
}

fn pred_matches(vals: &[&Value], pred: &Predicate) -> bool {
    match pred {
        Predicate::Eq(t) => eq_any(vals, t),
        Predicate::Ne(t) => !eq_any(vals, t),
        Predicate::Cmp(op, t) => vals.iter().any(|v| cmp_matches(v, *op, t)),
        Predicate::In(ts) => ts.iter().any(|t| eq_any(vals, t)),
        Predicate::Nin(ts) => !ts.iter().any(|t| eq_any(vals, t)),
        Predicate::Exists(want) => !vals.is_empty() == *want,
        Predicate::Size(n) => vals.iter().any(|v| v.as_array().is_some_and(|a| a.len() == *n)),
        Predicate::All(ts) => !ts.is_empty() && ts.iter().all(|t| eq_any(vals, t)),
        Predicate::Type(types) => vals.iter().any(|v| type_matches(v, types)),
        Predicate::Mod(m) => vals.iter().any(|v| self_or_elements(v, |e| m.matches(e))),
        Predicate::Bits(test, mask) => {
            vals.iter().any(|v| self_or_elements(v, |e| bits_of(e).is_some_and(|b| test.test(b, *mask))))
        }
        Predicate::Regex(p) => vals.iter().any(|v| self_or_elements(v, |e| p.matches(e))),
    }
}

fn self_or_elements(v: &Value, f: impl Fn(&Value) -> bool) -> bool {
    match v {
        Value::Array(items) => items.iter().any(f),
        other => f(other),
    }
}

#[derive(Clone, Copy)]
enum Ctx<'a> {
    Doc(&'a Document),
    Elem(&'a Value),
}

impl<'a> Ctx<'a> {
    fn values_at(self, path: &Path) -> Vec<&'a Value> {
        match self {
            Self::Doc(d) | Self::Elem(Value::Document(d)) => find_values(d, path),
            Self::Elem(_) => Vec::new(),
        }
    }
}

fn eval_node(tree: &FilterTree, id: NodeId, ctx: Ctx<'_>) -> bool {
    let node = tree.node(id);
    let all = || node.children.iter().all(|&c| eval_node(tree, c, ctx));
    let any = || node.children.iter().any(|&c| eval_node(tree, c, ctx));
    match &node.kind {
        NodeKind::And => all(),
        NodeKind::Or => any(),
        NodeKind::Nor => !any(),
        NodeKind::Not => !all(),
        NodeKind::Field { path, pred } => pred_matches(&ctx.values_at(path), pred),
        NodeKind::Value(pred) => match ctx {
            Ctx::Elem(v) => pred_matches(&[v], pred),
            Ctx::Doc(_) => false,
        },
        NodeKind::ElemMatch { path } => ctx.values_at(path).iter().any(|v| {
            v.as_array().is_some_and(|items| {
                items.iter().any(|e| node.children.iter().all(|&c| eval_node(tree, c, Ctx::Elem(e))))
            })
        }),
    }
}

/// Evaluates a compiled filter against one document.
#[must_use]
pub fn matches(doc: &Document, tree: &FilterTree) -> bool {
    eval_node(tree, tree.root(), Ctx::Doc(doc))
}

/// Evaluates a tree built by [`FilterTree::compile_element`] against a single value.
#[must_use]
pub fn matches_value(v: &Value, tree: &FilterTree) -> bool {
    eval_node(tree, tree.root(), Ctx::Elem(v))
}

/// Compiles `filter` and evaluates it once.
///
/// # Errors
/// Propagates compile errors.
pub fn filter_matches(doc: &Document, filter: &Document) -> Result<bool, DbError> {
    Ok(matches(doc, &FilterTree::compile(filter)?))
}
