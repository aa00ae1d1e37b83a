use crate::document::{Document, Path, Value};

/// Direction of one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    #[must_use]
    pub const fn apply(self, o: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            Self::Asc => o,
            Self::Desc => o.reverse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub path: Path,
    pub order: Order,
}

/// Outcome of a query-time comparison.
///
/// `NotEqual` is returned for values of incomparable types (for example a
/// string against a number); range operators never match such pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareResult {
    Less,
    Equal,
    Greater,
    NotEqual,
}

impl From<std::cmp::Ordering> for CompareResult {
    fn from(o: std::cmp::Ordering) -> Self {
        match o {
            std::cmp::Ordering::Less => Self::Less,
            std::cmp::Ordering::Equal => Self::Equal,
            std::cmp::Ordering::Greater => Self::Greater,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CmpOp {
    #[must_use]
    pub const fn accepts(self, r: CompareResult) -> bool {
        matches!(
            (self, r),
            (Self::Gt, CompareResult::Greater)
                | (Self::Gte, CompareResult::Greater | CompareResult::Equal)
                | (Self::Lt, CompareResult::Less)
                | (Self::Lte, CompareResult::Less | CompareResult::Equal)
        )
    }
}

/// Parameters of an in-memory `find`.
#[derive(Debug, Clone, Default)]
pub struct FindParams {
    pub filter: Document,
    pub sort: Option<Document>,
    /// Number of leading results to discard; must be non-negative.
    pub skip: i64,
    /// Maximum number of results, `0` for unlimited; must be non-negative.
    pub limit: i64,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateParams {
    pub filter: Document,
    pub update: Document,
    pub multi: bool,
    pub upsert: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    pub matched: u64,
    pub modified: u64,
    pub upserted_id: Option<Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: u64,
}
