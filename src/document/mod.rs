//! Value/document model shared by the comparator, matcher, sort and update engines.

mod convert;
mod doc;
mod path;
mod value;

pub use convert::parse_document_json;
pub use doc::Document;
pub(crate) use path::array_index;
pub use path::{MAX_ARRAY_BACKFILL, MAX_PATH_DEPTH, Path};
pub use value::{Binary, Value};

pub use bson::DateTime;
pub use bson::oid::ObjectId;

/// Name of the immutable primary-key field.
pub const ID_FIELD: &str = "_id";
