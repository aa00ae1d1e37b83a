//! Comparator, sort engine, filter matcher and the in-memory executor.

pub mod compare;
pub mod eval;
pub mod exec;
pub mod filter;
pub mod leaf;
pub mod sort;
mod types;

pub use compare::{compare, compare_for_sort, compare_scalars};
pub use eval::{filter_matches, match_arrays, match_documents, matches};
pub use exec::{count, delete, find, update};
pub use filter::FilterTree;
pub use sort::{parse_sort, sort_documents, sort_values};
pub use types::{CmpOp, CompareResult, DeleteReport, FindParams, Order, SortKey, UpdateParams, UpdateReport};
