//! Flow interpreter with incremental truth maintenance.
//!
//! A [`FlowEngine`] walks the flows of a compiled [`FlowSet`](diaflow_types::FlowSet) for each
//! [`FlowSession`]. Every active node carries at least one [`Support`]; when the support of a
//! path entry stops being valid, the entry and the strand behind it are collapsed and their
//! actions undone in reverse order.

mod action;
mod activation;
mod config;
mod engine;
mod entry;
mod error;
mod indication;
mod path;
mod registry;
mod runtime;
mod session;
mod support;

#[cfg(test)]
mod test_support;

pub use action::{ActionError, ActionRegistry, NodeAction};
pub use activation::{ActivationTable, NodeActivationState};
pub use config::{DEFAULT_MAX_FLOW_STEPS, DEFAULT_MAX_ROUNDS, EngineConfig};
pub use engine::{FlowEngine, PropagationReport};
pub use entry::Entry;
pub use error::EngineError;
pub use indication::{Indication, IndicationContext, IndicationSource, NoIndications, TriggerTable};
pub use path::{Path, PathId};
pub use registry::FlowRegistry;
pub use session::FlowSession;
pub use support::{Support, SupportContext, SupportId, SupportKind};
