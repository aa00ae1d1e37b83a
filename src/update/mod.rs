//! Update-operator engine.

pub mod arith;
mod ops;
mod types;
mod upsert;

pub use arith::{ArithError, add, multiply, multiply_long_safely};
pub use ops::{UpdateContext, UpdateOutcome, apply_update, apply_update_in_place};
pub use types::{UpdateKind, UpdateOp, UpdateSpec};
pub use upsert::{build_upsert_document, upsert_id};
