use crate::document::{Document, Path, Value};
use crate::errors::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    Set,
    SetOnInsert,
    Unset,
    Inc,
    Mul,
    Min,
    Max,
    Rename,
    CurrentDate,
    Push,
    AddToSet,
    Pop,
    Pull,
    PullAll,
    Bit,
}

impl UpdateKind {
    #[must_use]
    pub fn parse(op: &str) -> Option<Self> {
        Some(match op {
            "$set" => Self::Set,
            "$setOnInsert" => Self::SetOnInsert,
            "$unset" => Self::Unset,
            "$inc" => Self::Inc,
            "$mul" => Self::Mul,
            "$min" => Self::Min,
            "$max" => Self::Max,
            "$rename" => Self::Rename,
            "$currentDate" => Self::CurrentDate,
            "$push" => Self::Push,
            "$addToSet" => Self::AddToSet,
            "$pop" => Self::Pop,
            "$pull" => Self::Pull,
            "$pullAll" => Self::PullAll,
            "$bit" => Self::Bit,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Set => "$set",
            Self::SetOnInsert => "$setOnInsert",
            Self::Unset => "$unset",
            Self::Inc => "$inc",
            Self::Mul => "$mul",
            Self::Min => "$min",
            Self::Max => "$max",
            Self::Rename => "$rename",
            Self::CurrentDate => "$currentDate",
            Self::Push => "$push",
            Self::AddToSet => "$addToSet",
            Self::Pop => "$pop",
            Self::Pull => "$pull",
            Self::PullAll => "$pullAll",
            Self::Bit => "$bit",
        }
    }
}

/// One operator applied to one path.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOp {
    pub kind: UpdateKind,
    pub path: Path,
    pub operand: Value,
    /// Destination of `$rename`.
    pub target: Option<Path>,
}

/// A validated update document.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateSpec {
    /// Whole-document replacement; `_id` is preserved.
    Replacement(Document),
    /// Operators in the order they appeared.
    Operators(Vec<UpdateOp>),
}

fn parse_path(op: UpdateKind, field: &str, max_depth: usize) -> Result<Path, DbError> {
    let path = Path::parse_with_depth(field, max_depth)?;
    if let Some(seg) = path.segments().iter().find(|s| s.starts_with('$')) {
        return Err(DbError::not_implemented(
            field,
            format!("{} with positional segment '{seg}' is not supported", op.name()),
        ));
    }
    Ok(path)
}

impl UpdateSpec {
    /// # Errors
    /// See [`UpdateSpec::parse_with_depth`].
    pub fn parse(update: &Document) -> Result<Self, DbError> {
        Self::parse_with_depth(update, crate::document::MAX_PATH_DEPTH)
    }

    /// Classifies and validates an update document.
    ///
    /// # Errors
    /// - `BadValue` when operator and plain keys are mixed, for a bad `$rename`
    ///   target, or for two operators on overlapping paths.
    /// - `TypeMismatch` when an operator's operand is not a document.
    /// - `NotImplemented` for unknown operators and positional paths.
    pub fn parse_with_depth(update: &Document, max_depth: usize) -> Result<Self, DbError> {
        let Some(first) = update.keys().next() else {
            return Ok(Self::Replacement(Document::new()));
        };
        if !first.starts_with('$') {
            if let Some(k) = update.keys().find(|k| k.starts_with('$')) {
                return Err(DbError::bad_value(k, format!("The dollar ($) prefixed field '{k}' is not valid in a replacement document")));
            }
            return Ok(Self::Replacement(update.clone()));
        }

        let mut ops = Vec::new();
        for (name, operand) in update.iter() {
            if !name.starts_with('$') {
                return Err(DbError::bad_value(name, format!("Unknown modifier: {name}. Expected a valid update modifier or pipeline-style update")));
            }
            let kind = UpdateKind::parse(name)
                .ok_or_else(|| DbError::not_implemented(name, format!("update operator {name} is not implemented")))?;
            let Value::Document(fields) = operand else {
                return Err(DbError::type_mismatch(
                    name,
                    format!(
                        "Modifiers operate on fields but we found type {} instead. For example: {{$mod: {{<field>: ...}}}} not {{{name}: {operand}}}",
                        operand.type_name()
                    ),
                ));
            };
            for (field, arg) in fields.iter() {
                let path = parse_path(kind, field, max_depth)?;
                let target = if kind == UpdateKind::Rename {
                    let Value::String(to) = arg else {
                        return Err(DbError::bad_value(field, format!("The 'to' field for $rename must be a string: {field}: {arg}")));
                    };
                    if to == field {
                        return Err(DbError::bad_value(field, format!("The source and target field for $rename must differ: {field}: \"{to}\"")));
                    }
                    Some(parse_path(kind, to, max_depth)?)
                } else {
                    None
                };
                ops.push(UpdateOp { kind, path, operand: arg.clone(), target });
            }
        }
        check_conflicts(&ops)?;
        Ok(Self::Operators(ops))
    }

    #[must_use]
    pub const fn is_replacement(&self) -> bool {
        matches!(self, Self::Replacement(_))
    }
}

fn check_conflicts(ops: &[UpdateOp]) -> Result<(), DbError> {
    let paths: Vec<&Path> = ops.iter().flat_map(|op| std::iter::once(&op.path).chain(op.target.as_ref())).collect();
    for (i, a) in paths.iter().enumerate() {
        for b in &paths[i + 1..] {
            if a.is_prefix_of(b) || b.is_prefix_of(a) {
                return Err(DbError::bad_value(
                    b.to_string(),
                    format!("Updating the path '{b}' would create a conflict at '{a}'"),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_document_json;

    fn parse(json: &str) -> Result<UpdateSpec, DbError> {
        UpdateSpec::parse(&parse_document_json(json).unwrap())
    }

    #[test]
    fn classifies_replacement_and_operators() {
        assert!(parse(r#"{"a": 1}"#).unwrap().is_replacement());
        assert!(parse("{}").unwrap().is_replacement());
        let UpdateSpec::Operators(ops) = parse(r#"{"$set": {"a": 1, "b.c": 2}, "$inc": {"n": 1}}"#).unwrap() else {
            panic!("expected operators");
        };
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[2].kind, UpdateKind::Inc);
    }

    #[test]
    fn rejects_mixed_and_unknown() {
        assert!(matches!(parse(r#"{"$set": {"a": 1}, "b": 2}"#), Err(DbError::BadValue { .. })));
        assert!(matches!(parse(r#"{"a": 1, "$set": {"b": 2}}"#), Err(DbError::BadValue { .. })));
        assert!(matches!(parse(r#"{"$frobnicate": {"a": 1}}"#), Err(DbError::NotImplemented { .. })));
        assert!(matches!(parse(r#"{"$set": 1}"#), Err(DbError::TypeMismatch { .. })));
        assert!(matches!(parse(r#"{"$set": {"a.$": 1}}"#), Err(DbError::NotImplemented { .. })));
    }

    #[test]
    fn overlapping_paths_conflict() {
        let err = parse(r#"{"$set": {"a": 1}, "$inc": {"a.b": 1}}"#).unwrap_err();
        assert!(matches!(err, DbError::BadValue { .. }));
        assert!(parse(r#"{"$set": {"a": 1}, "$inc": {"ab": 1}}"#).is_ok());
        assert!(parse(r#"{"$rename": {"a": "b"}, "$set": {"b": 1}}"#).is_err());
    }
}
