use diaflow_types::{EdgeRef, NodeRef};
use indexmap::IndexMap;

use crate::support::{Support, SupportId};

/// Supports currently held by one node. The node is active iff the set is non-empty.
#[derive(Debug, Clone, Default)]
pub struct NodeActivationState {
    supports: IndexMap<SupportId, Support>,
}

impl NodeActivationState {
    /// Returns true if the support was not already present.
    pub fn add_support(&mut self, support: Support) -> bool {
        if self.supports.contains_key(&support.id()) {
            return false;
        }
        self.supports.insert(support.id(), support);
        true
    }

    pub fn remove_support(&mut self, id: SupportId) -> bool {
        self.supports.shift_remove(&id).is_some()
    }

    pub fn is_active(&self) -> bool {
        !self.supports.is_empty()
    }

    pub fn supports(&self) -> impl Iterator<Item = &Support> {
        self.supports.values()
    }

    pub fn has_edge_support(&self, edge: EdgeRef) -> bool {
        self.supports().any(|support| support.edge() == Some(edge))
    }

    /// Drops every support failing `keep`; returns how many were dropped.
    pub fn retain_valid(&mut self, mut keep: impl FnMut(&Support) -> bool) -> usize {
        let before = self.supports.len();
        self.supports.retain(|_, support| keep(support));
        before - self.supports.len()
    }
}

/// Per-session activation states, created lazily on first support.
#[derive(Debug, Clone, Default)]
pub struct ActivationTable {
    states: IndexMap<NodeRef, NodeActivationState>,
}

impl ActivationTable {
    pub fn get(&self, node: NodeRef) -> Option<&NodeActivationState> {
        self.states.get(&node)
    }

    pub fn state_mut(&mut self, node: NodeRef) -> &mut NodeActivationState {
        self.states.entry(node).or_default()
    }

    pub fn is_active(&self, node: NodeRef) -> bool {
        self.get(node).is_some_and(NodeActivationState::is_active)
    }

    pub fn add_support(&mut self, node: NodeRef, support: Support) -> bool {
        self.state_mut(node).add_support(support)
    }

    pub fn remove_support(&mut self, node: NodeRef, id: SupportId) -> bool {
        self.states
            .get_mut(&node)
            .is_some_and(|state| state.remove_support(id))
    }

    /// Active nodes in ascending order.
    pub fn active_nodes(&self) -> Vec<NodeRef> {
        let mut nodes: Vec<_> = self
            .states
            .iter()
            .filter(|(_, state)| state.is_active())
            .map(|(node, _)| *node)
            .collect();
        nodes.sort();
        nodes
    }
}
