use thiserror::Error;

/// Errors surfaced by the query, sort, update and cursor layers.
///
/// Every variant a client can trigger names the offending field (or operator)
/// so the protocol layer can build a diagnostic without re-parsing the request.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("BadValue: {msg} (field '{field}')")]
    BadValue { field: String, msg: String },

    #[error("TypeMismatch: {msg} (field '{field}')")]
    TypeMismatch { field: String, msg: String },

    #[error("NotWholeNumber: '{field}' must be a whole number")]
    NotWholeNumber { field: String },

    #[error("Infinity: {msg} (field '{field}')")]
    Infinity { field: String, msg: String },

    #[error("LongExceeded: {msg} (field '{field}')")]
    LongExceeded { field: String, msg: String },

    #[error("IntExceeded: {msg} (field '{field}')")]
    IntExceeded { field: String, msg: String },

    #[error("ImmutableField: {msg} (field '{field}')")]
    ImmutableField { field: String, msg: String },

    #[error("NotImplemented: {msg} (field '{field}')")]
    NotImplemented { field: String, msg: String },

    #[error("maximum sort keys exceeded: {count} > {max}")]
    SortKeyLimitExceeded { count: usize, max: usize },

    #[error("cursor id {id} not found")]
    CursorNotFound { id: i64 },

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl DbError {
    pub fn bad_value(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::BadValue { field: field.into(), msg: msg.into() }
    }

    pub fn type_mismatch(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::TypeMismatch { field: field.into(), msg: msg.into() }
    }

    pub fn not_implemented(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::NotImplemented { field: field.into(), msg: msg.into() }
    }

    pub fn immutable_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ImmutableField { field: field.into(), msg: msg.into() }
    }

    /// Name of the field or operator the error refers to, if any.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::BadValue { field, .. }
            | Self::TypeMismatch { field, .. }
            | Self::NotWholeNumber { field }
            | Self::Infinity { field, .. }
            | Self::LongExceeded { field, .. }
            | Self::IntExceeded { field, .. }
            | Self::ImmutableField { field, .. }
            | Self::NotImplemented { field, .. } => Some(field),
            Self::SortKeyLimitExceeded { .. } => Some("sort"),
            Self::CursorNotFound { .. }
            | Self::Conversion(_)
            | Self::Json(_)
            | Self::Config(_)
            | Self::Io(_) => None,
        }
    }

    /// MongoDB error code for the wire-level error document.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::BadValue { .. }
            | Self::NotWholeNumber { .. }
            | Self::Infinity { .. }
            | Self::LongExceeded { .. }
            | Self::IntExceeded { .. }
            | Self::SortKeyLimitExceeded { .. } => 2,
            Self::TypeMismatch { .. } => 14,
            Self::CursorNotFound { .. } => 43,
            Self::ImmutableField { .. } => 66,
            Self::NotImplemented { .. } => 238,
            Self::Conversion(_) | Self::Json(_) | Self::Config(_) | Self::Io(_) => 1,
        }
    }
}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
