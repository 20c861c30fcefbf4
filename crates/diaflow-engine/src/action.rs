use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use diaflow_cond::FactStore;
use diaflow_types::{Name, Node};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{0}")]
    Failed(String),
    #[error("node '{node}' rejected the current facts: {reason}")]
    Rejected { node: String, reason: String },
}

impl ActionError {
    pub fn failed(message: impl Into<String>) -> Self {
        ActionError::Failed(message.into())
    }
}

/// Host behaviour attached to `Invoke` action nodes.
///
/// `do_action` runs once each time the node gains a path entry; `undo_action` runs when that
/// entry is collapsed.
pub trait NodeAction: Send + Sync {
    fn do_action(&self, node: &Node, facts: &mut dyn FactStore) -> Result<(), ActionError>;

    fn undo_action(&self, node: &Node, facts: &mut dyn FactStore) -> Result<(), ActionError>;
}

#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<Name, Arc<dyn NodeAction>>,
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.actions.keys().collect();
        names.sort();
        f.debug_struct("ActionRegistry").field("actions", &names).finish()
    }
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<Name>, action: Arc<dyn NodeAction>) {
        self.actions.insert(name.into(), action);
    }

    pub fn with(mut self, name: impl Into<Name>, action: Arc<dyn NodeAction>) -> Self {
        self.register(name, action);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn NodeAction>> {
        self.actions.get(name)
    }
}
