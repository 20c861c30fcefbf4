//! Flowchart data model: serializable definitions, semantic validation and the compiled
//! read-only graph consumed by the engine.

pub mod graph;
mod model;
pub mod validate;

pub use graph::{Edge, EdgeRef, Flow, FlowRef, FlowSet, Node, NodeKind, NodeRef, Trigger, TriggerRef};
pub use model::*;
pub use validate::ValidationError;
