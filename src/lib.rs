pub mod config;
pub mod cursor;
pub mod document;
pub mod errors;
pub mod query;
pub mod update;
pub mod utils;

pub use config::QueryConfig;
pub use cursor::{Batch, CursorRegistry, DocIter, KillReport, Tenant};
pub use document::{Document, Path, Value, parse_document_json};
pub use errors::DbError;
pub use query::{FilterTree, FindParams, Order, UpdateParams};
pub use update::{UpdateContext, UpdateSpec, apply_update};
