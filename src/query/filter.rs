//! Filter documents compiled into an arena-backed predicate tree.
//!
//! Nodes are addressed by index; each node lists its children by index and
//! records its parent as a back-index only.

use crate::document::{Document, Path, Value};
use crate::errors::DbError;
use crate::utils::num::whole_number;

use super::leaf::{BitTest, Modulo, Pattern, TypeTest, parse_bitmask, parse_types};
use super::types::CmpOp;

pub type NodeId = usize;

/// Leaf predicate applied to the value(s) found at a path.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(Value),
    Ne(Value),
    Cmp(CmpOp, Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
    Size(usize),
    All(Vec<Value>),
    Type(Vec<TypeTest>),
    Mod(Modulo),
    Bits(BitTest, u64),
    Regex(Pattern),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// All children match. The root is always an `And`.
    And,
    Or,
    Nor,
    /// Negates the conjunction of its children; used for `$not`.
    Not,
    /// Predicate on the value(s) at `path` of the current document.
    Field { path: Path, pred: Predicate },
    /// Predicate on the current value itself (inside `$elemMatch` / `$pull`).
    Value(Predicate),
    /// Some array element at `path` satisfies every child.
    ElemMatch { path: Path },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterTree {
    nodes: Vec<FilterNode>,
}

const ROOT: NodeId = 0;

impl FilterTree {
    /// # Errors
    /// `BadValue` for malformed operands, `NotImplemented` for unknown operators.
    pub fn compile(filter: &Document) -> Result<Self, DbError> {
        Self::compile_with_depth(filter, crate::document::MAX_PATH_DEPTH)
    }

    /// # Errors
    /// See [`FilterTree::compile`].
    pub fn compile_with_depth(filter: &Document, max_depth: usize) -> Result<Self, DbError> {
        let mut c = Compiler { tree: Self::with_root(), max_depth };
        c.document(ROOT, filter)?;
        Ok(c.tree)
    }

    /// Compiles an element condition as used by `$elemMatch` and `$pull`:
    /// an operator document applies to the element itself, any other
    /// document is a filter on element documents.
    ///
    /// # Errors
    /// See [`FilterTree::compile`].
    pub fn compile_element(cond: &Document, max_depth: usize) -> Result<Self, DbError> {
        let mut c = Compiler { tree: Self::with_root(), max_depth };
        c.element(ROOT, cond)?;
        Ok(c.tree)
    }

    fn with_root() -> Self {
        Self { nodes: vec![FilterNode { kind: NodeKind::And, parent: None, children: Vec::new() }] }
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        ROOT
    }

    /// # Panics
    /// If `id` was not produced by this tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &FilterNode {
        &self.nodes[id]
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes[ROOT].children.is_empty()
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(FilterNode { kind, parent: Some(parent), children: Vec::new() });
        self.nodes[parent].children.push(id);
        id
    }
}

fn is_operator_doc(d: &Document) -> bool {
    d.keys().next().is_some_and(|k| k.starts_with('$'))
}

fn array_operand<'a>(op: &str, v: &'a Value) -> Result<&'a [Value], DbError> {
    v.as_array().ok_or_else(|| DbError::bad_value(op, format!("{op} needs an array")))
}

struct Compiler {
    tree: FilterTree,
    max_depth: usize,
}

impl Compiler {
    fn document(&mut self, parent: NodeId, filter: &Document) -> Result<(), DbError> {
        for (key, value) in filter.iter() {
            match key {
                "$and" | "$or" | "$nor" => self.logical(parent, key, value)?,
                "$comment" => {}
                k if k.starts_with('$') => {
                    return Err(DbError::not_implemented(k, format!("unknown top level operator: {k}")));
                }
                k => {
                    let path = Path::parse_with_depth(k, self.max_depth)?;
                    match value {
                        Value::Document(ops) if is_operator_doc(ops) => self.field_ops(parent, &path, ops)?,
                        v => {
                            self.tree.push(parent, NodeKind::Field { path, pred: Predicate::Eq(v.clone()) });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn logical(&mut self, parent: NodeId, op: &str, value: &Value) -> Result<(), DbError> {
        let items = value
            .as_array()
            .ok_or_else(|| DbError::bad_value(op, format!("{op} must be an array")))?;
        if items.is_empty() {
            return Err(DbError::bad_value(op, format!("{op} must be a nonempty array")));
        }
        let kind = match op {
            "$and" => NodeKind::And,
            "$or" => NodeKind::Or,
            _ => NodeKind::Nor,
        };
        let node = self.tree.push(parent, kind);
        for item in items {
            let Value::Document(sub) = item else {
                return Err(DbError::bad_value(op, format!("{op} argument's entries must be objects")));
            };
            let branch = self.tree.push(node, NodeKind::And);
            self.document(branch, sub)?;
        }
        Ok(())
    }

    fn field_ops(&mut self, parent: NodeId, path: &Path, ops: &Document) -> Result<(), DbError> {
        for (op, operand) in ops.iter() {
            match op {
                "$not" => {
                    let Value::Document(inner) = operand else {
                        return Err(DbError::bad_value(op, "$not needs a document"));
                    };
                    if !is_operator_doc(inner) {
                        return Err(DbError::bad_value(op, "$not needs a document of operators"));
                    }
                    let node = self.tree.push(parent, NodeKind::Not);
                    self.field_ops(node, path, inner)?;
                }
                "$elemMatch" => {
                    let Value::Document(cond) = operand else {
                        return Err(DbError::bad_value(op, "$elemMatch needs an Object"));
                    };
                    let node = self.tree.push(parent, NodeKind::ElemMatch { path: path.clone() });
                    self.element(node, cond)?;
                }
                _ => {
                    if let Some(pred) = predicate(op, operand, ops)? {
                        self.tree.push(parent, NodeKind::Field { path: path.clone(), pred });
                    }
                }
            }
        }
        Ok(())
    }

    fn element(&mut self, parent: NodeId, cond: &Document) -> Result<(), DbError> {
        if !is_operator_doc(cond) {
            return self.document(parent, cond);
        }
        for (op, operand) in cond.iter() {
            match op {
                "$not" => {
                    let Value::Document(inner) = operand else {
                        return Err(DbError::bad_value(op, "$not needs a document"));
                    };
                    let node = self.tree.push(parent, NodeKind::Not);
                    self.element(node, inner)?;
                }
                "$and" | "$or" | "$nor" => self.logical(parent, op, operand)?,
                "$elemMatch" => {
                    return Err(DbError::not_implemented(op, "nested $elemMatch on array elements"));
                }
                _ => {
                    if let Some(pred) = predicate(op, operand, cond)? {
                        self.tree.push(parent, NodeKind::Value(pred));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Leaf predicate for one operator. `siblings` is the operator document it
/// came from; `$options` is consumed by `$regex` and yields no predicate.
fn predicate(op: &str, operand: &Value, siblings: &Document) -> Result<Option<Predicate>, DbError> {
    if let Some(test) = BitTest::from_operator(op) {
        return Ok(Some(Predicate::Bits(test, parse_bitmask(op, operand)?)));
    }
    Ok(Some(match op {
        "$eq" => Predicate::Eq(operand.clone()),
        "$ne" => Predicate::Ne(operand.clone()),
        "$gt" => Predicate::Cmp(CmpOp::Gt, operand.clone()),
        "$gte" => Predicate::Cmp(CmpOp::Gte, operand.clone()),
        "$lt" => Predicate::Cmp(CmpOp::Lt, operand.clone()),
        "$lte" => Predicate::Cmp(CmpOp::Lte, operand.clone()),
        "$in" => Predicate::In(array_operand(op, operand)?.to_vec()),
        "$nin" => Predicate::Nin(array_operand(op, operand)?.to_vec()),
        "$all" => Predicate::All(array_operand(op, operand)?.to_vec()),
        "$exists" => Predicate::Exists(truthy(operand)),
        "$size" => {
            let n = whole_number(operand)
                .ok()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| DbError::bad_value(op, format!("Failed to parse $size. Expected a non-negative whole number, got {operand}")))?;
            Predicate::Size(n)
        }
        "$type" => Predicate::Type(parse_types(op, operand)?),
        "$mod" => Predicate::Mod(Modulo::parse(op, operand)?),
        "$regex" => Predicate::Regex(Pattern::from_operands(operand, siblings.get("$options"))?),
        "$options" if siblings.get("$regex").is_some() => return Ok(None),
        "$options" => return Err(DbError::bad_value(op, "$options needs a $regex")),
        _ => return Err(DbError::not_implemented(op, format!("unknown operator: {op}"))),
    }))
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int32(i) => *i != 0,
        Value::Int64(i) => *i != 0,
        Value::Double(d) => *d != 0.0,
        _ => true,
    }
}
