use diaflow_types::{NodeRef, ValidationError};
use thiserror::Error;

use crate::action::ActionError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid flow definitions: {0}")]
    Validation(#[from] ValidationError),
    #[error("structural violation: {0}")]
    StructuralViolation(String),
    #[error("action of node '{node}' failed: {source}")]
    Action {
        node: String,
        #[source]
        source: ActionError,
    },
    #[error("{0} is not part of this flow set")]
    UnknownNode(NodeRef),
    #[error("flow '{0}' not found")]
    UnknownFlow(String),
    #[error("flow '{flow}' has no start node '{start}'")]
    UnknownStartNode { flow: String, start: String },
    #[error("no action registered under '{0}'")]
    UnknownAction(String),
    #[error("node '{0}' cannot anchor a path")]
    NotAnOrigin(String),
    #[error("node '{0}' is not a composed node")]
    NotComposed(String),
    #[error("{what} exceeded the limit of {limit}")]
    IterationLimit { what: &'static str, limit: usize },
}
