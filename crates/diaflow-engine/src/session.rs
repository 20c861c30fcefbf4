use std::collections::HashMap;

use diaflow_cond::{FactState, FactStore};
use diaflow_types::{FactId, NodeRef};
use indexmap::IndexSet;

use crate::activation::ActivationTable;
use crate::path::{Path, PathId};
use crate::registry::FlowRegistry;
use crate::support::{Support, SupportId, SupportKind};

/// Per-session execution state: the facts, node activations and live paths.
///
/// Sessions are created by [`FlowEngine::new_session`](crate::FlowEngine::new_session) and
/// driven through the engine; they hold no reference to it.
#[derive(Debug)]
pub struct FlowSession<F: FactStore> {
    pub(crate) facts: F,
    pub(crate) truth: TruthState,
    pub(crate) registry: FlowRegistry,
}

impl<F: FactStore> FlowSession<F> {
    pub(crate) fn new(facts: F) -> Self {
        Self {
            facts,
            truth: TruthState::default(),
            registry: FlowRegistry::default(),
        }
    }

    pub fn facts(&self) -> &F {
        &self.facts
    }

    /// Direct access to the facts. Changes take effect on the next `propagate`, which should
    /// name the changed facts.
    pub fn facts_mut(&mut self) -> &mut F {
        &mut self.facts
    }

    pub fn into_facts(self) -> F {
        self.facts
    }

    pub fn activation(&self) -> &ActivationTable {
        &self.truth.activation
    }

    pub fn is_active(&self, node: NodeRef) -> bool {
        self.truth.activation.is_active(node)
    }

    pub fn active_nodes(&self) -> Vec<NodeRef> {
        self.truth.activation.active_nodes()
    }

    pub fn registry(&self) -> &FlowRegistry {
        &self.registry
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.registry.iter()
    }

    /// Snapshot nodes currently reached, in the order they were reached.
    pub fn reached_snapshots(&self) -> Vec<NodeRef> {
        self.truth.snapshots.iter().copied().collect()
    }

    /// Allocates a support with a fresh session-unique id.
    pub fn new_support(&mut self, kind: SupportKind) -> Support {
        self.truth.new_support(kind)
    }
}

#[derive(Debug, Default)]
pub(crate) struct TruthState {
    pub activation: ActivationTable,
    /// Fact states replaced by active `Assign` nodes.
    pub assigned: HashMap<NodeRef, FactState>,
    /// Support each active composed node registered on its called start node.
    pub subflows: HashMap<NodeRef, (NodeRef, SupportId)>,
    pub snapshots: IndexSet<NodeRef>,
    /// Paths opened while another path is being processed; adopted by the registry afterwards.
    pub spawned: Vec<Path>,
    /// Facts written by actions since the last indication pass.
    pub touched: Vec<FactId>,
    next_support: u64,
    next_path: u64,
}

impl TruthState {
    pub fn new_support(&mut self, kind: SupportKind) -> Support {
        self.next_support += 1;
        Support::new(SupportId(self.next_support), kind)
    }

    pub fn next_path_id(&mut self) -> PathId {
        self.next_path += 1;
        PathId(self.next_path)
    }

    pub fn take_spawned(&mut self) -> Vec<Path> {
        std::mem::take(&mut self.spawned)
    }

    pub fn take_touched(&mut self) -> Vec<FactId> {
        std::mem::take(&mut self.touched)
    }
}
