//! Three-valued condition evaluation over a session fact store.

mod eval;
mod facts;

pub use eval::{Condition, Indeterminate, Outcome, eval_condition};
pub use facts::{FactState, FactStore, MemFactStore};
