//! Skip/limit pagination and the cursor registry.

pub mod iter;
mod registry;

pub use iter::{BoxedIter, DocIter, LimitIter, SkipIter, VecIter, collect_all, limit, skip, take_batch};
pub use registry::{Batch, Cursor, CursorRegistry, KillReport, Tenant};
