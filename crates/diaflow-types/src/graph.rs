//! Compiled, read-only flow graph.
//!
//! `FlowSet::build` validates a [`DefFlowSet`] and resolves every name into a dense index, so the
//! engine addresses nodes and edges by [`NodeRef`] / [`EdgeRef`] and never touches strings on the
//! hot path. Outgoing edges keep their declaration order.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use serde::{Deserialize, Serialize};

use crate::validate::{ValidationError, validate_flow_set};
use crate::{CondExpr, DefAction, DefFlowSet, DefNodeKind, FactId, Name};

macro_rules! index_type {
    ($name:ident, $prefix:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

index_type!(FlowRef, "flow#");
index_type!(NodeRef, "node#");
index_type!(EdgeRef, "edge#");
index_type!(TriggerRef, "trigger#");

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Start,
    Action(DefAction),
    /// Calls the start node `called` of another flow.
    Composed { called: NodeRef },
    Snapshot,
}

impl NodeKind {
    /// Start and snapshot nodes may anchor a new path.
    pub fn is_origin(&self) -> bool {
        matches!(self, NodeKind::Start | NodeKind::Snapshot)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub flow: FlowRef,
    pub name: Name,
    pub kind: NodeKind,
    pub outgoing: Vec<EdgeRef>,
    pub incoming: Vec<EdgeRef>,
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub source: NodeRef,
    pub target: NodeRef,
    /// `None` is always satisfied.
    pub condition: Option<CondExpr>,
}

#[derive(Debug, Clone)]
pub struct Flow {
    pub name: Name,
    pub autostart: bool,
    pub nodes: Vec<NodeRef>,
    pub edges: Vec<EdgeRef>,
}

#[derive(Debug, Clone)]
pub struct Trigger {
    pub name: Name,
    pub start: NodeRef,
    pub when: CondExpr,
}

#[derive(Debug, Clone, Default)]
pub struct FlowSet {
    flows: Vec<Flow>,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    triggers: Vec<Trigger>,
    flow_index: IndexMap<Name, FlowRef>,
    node_index: HashMap<(FlowRef, Name), NodeRef>,
    triggers_by_fact: IndexMap<FactId, Vec<TriggerRef>>,
    /// Edges plus composed calls; node indices equal `NodeRef` values.
    reach: DiGraph<NodeRef, ()>,
}

impl FlowSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn build(def: DefFlowSet) -> Result<Self, ValidationError> {
        validate_flow_set(&def)?;

        let mut set = FlowSet::default();
        // Composed targets are resolved once every node has an index.
        let mut calls = Vec::new();

        for (flow_idx, def_flow) in def.flows.into_iter().enumerate() {
            let flow_ref = FlowRef(flow_idx);
            let mut flow = Flow {
                name: def_flow.name.clone(),
                autostart: def_flow.autostart,
                nodes: Vec::with_capacity(def_flow.nodes.len()),
                edges: Vec::with_capacity(def_flow.edges.len()),
            };

            for def_node in def_flow.nodes {
                let node_ref = NodeRef(set.nodes.len());
                let kind = match def_node.kind {
                    DefNodeKind::Start => NodeKind::Start,
                    DefNodeKind::Snapshot => NodeKind::Snapshot,
                    DefNodeKind::Action { action } => NodeKind::Action(action),
                    DefNodeKind::Composed { flow, start } => {
                        calls.push((node_ref, flow, start));
                        NodeKind::Composed { called: node_ref }
                    }
                };
                set.node_index.insert((flow_ref, def_node.name.clone()), node_ref);
                set.nodes.push(Node {
                    flow: flow_ref,
                    name: def_node.name,
                    kind,
                    outgoing: Vec::new(),
                    incoming: Vec::new(),
                });
                flow.nodes.push(node_ref);
            }

            for def_edge in def_flow.edges {
                let edge_ref = EdgeRef(set.edges.len());
                let source = set.lookup(flow_ref, &def_edge.from)?;
                let target = set.lookup(flow_ref, &def_edge.to)?;
                set.nodes[source.0].outgoing.push(edge_ref);
                set.nodes[target.0].incoming.push(edge_ref);
                set.edges.push(Edge {
                    source,
                    target,
                    condition: def_edge.when,
                });
                flow.edges.push(edge_ref);
            }

            set.flow_index.insert(def_flow.name, flow_ref);
            set.flows.push(flow);
        }

        for (node_ref, flow, start) in calls {
            let called = set
                .find_start_node(&flow, &start)
                .ok_or_else(|| ValidationError::UnknownCalledStart {
                    flow: set.flow(set.node(node_ref).flow).name.clone(),
                    node: set.node(node_ref).name.clone(),
                    called_flow: flow.clone(),
                    start: start.clone(),
                })?;
            set.nodes[node_ref.0].kind = NodeKind::Composed { called };
        }

        for def_trigger in def.triggers {
            let trigger_ref = TriggerRef(set.triggers.len());
            let start = set
                .find_start_node(&def_trigger.flow, &def_trigger.start)
                .ok_or_else(|| ValidationError::UnknownTriggerTarget {
                    trigger: def_trigger.name.clone(),
                    flow: def_trigger.flow.clone(),
                    start: def_trigger.start.clone(),
                })?;
            for fact in def_trigger.when.facts() {
                set.triggers_by_fact
                    .entry(fact)
                    .or_default()
                    .push(trigger_ref);
            }
            set.triggers.push(Trigger {
                name: def_trigger.name,
                start,
                when: def_trigger.when,
            });
        }

        set.reach = set.reach_graph();
        Ok(set)
    }

    fn lookup(&self, flow: FlowRef, name: &str) -> Result<NodeRef, ValidationError> {
        self.node_index
            .get(&(flow, name.to_string()))
            .copied()
            .ok_or_else(|| ValidationError::EdgeReferencesUnknownNode {
                flow: self
                    .flows
                    .get(flow.0)
                    .map(|f| f.name.clone())
                    .unwrap_or_default(),
                node: name.to_string(),
            })
    }

    fn reach_graph(&self) -> DiGraph<NodeRef, ()> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.edges.len());
        for idx in 0..self.nodes.len() {
            graph.add_node(NodeRef(idx));
        }
        for edge in &self.edges {
            graph.add_edge(
                NodeIndex::new(edge.source.0),
                NodeIndex::new(edge.target.0),
                (),
            );
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            if let NodeKind::Composed { called } = node.kind {
                graph.add_edge(NodeIndex::new(idx), NodeIndex::new(called.0), ());
            }
        }
        graph
    }

    /// True when the set holds no flows; the engine treats such a set as inert.
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn node(&self, node: NodeRef) -> &Node {
        &self.nodes[node.0]
    }

    /// Checked variant of [`FlowSet::node`] for ids that may come from another flow set.
    pub fn get_node(&self, node: NodeRef) -> Option<&Node> {
        self.nodes.get(node.0)
    }

    pub fn edge(&self, edge: EdgeRef) -> &Edge {
        &self.edges[edge.0]
    }

    pub fn flow(&self, flow: FlowRef) -> &Flow {
        &self.flows[flow.0]
    }

    pub fn trigger(&self, trigger: TriggerRef) -> &Trigger {
        &self.triggers[trigger.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeRef, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (NodeRef(idx), node))
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeRef, &Edge)> {
        self.edges
            .iter()
            .enumerate()
            .map(|(idx, edge)| (EdgeRef(idx), edge))
    }

    pub fn flows(&self) -> impl Iterator<Item = (FlowRef, &Flow)> {
        self.flows
            .iter()
            .enumerate()
            .map(|(idx, flow)| (FlowRef(idx), flow))
    }

    pub fn triggers(&self) -> impl Iterator<Item = (TriggerRef, &Trigger)> {
        self.triggers
            .iter()
            .enumerate()
            .map(|(idx, trigger)| (TriggerRef(idx), trigger))
    }

    pub fn find_flow(&self, name: &str) -> Option<FlowRef> {
        self.flow_index.get(name).copied()
    }

    pub fn find_node(&self, flow: &str, node: &str) -> Option<NodeRef> {
        let flow = self.find_flow(flow)?;
        self.node_index.get(&(flow, node.to_string())).copied()
    }

    pub fn find_start_node(&self, flow: &str, start: &str) -> Option<NodeRef> {
        self.find_node(flow, start)
            .filter(|node| matches!(self.node(*node).kind, NodeKind::Start))
    }

    pub fn start_nodes(&self, flow: FlowRef) -> impl Iterator<Item = NodeRef> + '_ {
        self.flow(flow)
            .nodes
            .iter()
            .copied()
            .filter(|node| matches!(self.node(*node).kind, NodeKind::Start))
    }

    /// Start nodes of every flow declared `autostart`, in declaration order.
    pub fn autostart_nodes(&self) -> Vec<NodeRef> {
        self.flows()
            .filter(|(_, flow)| flow.autostart)
            .flat_map(|(flow_ref, _)| self.start_nodes(flow_ref))
            .collect()
    }

    pub fn triggers_reading(&self, fact: &str) -> &[TriggerRef] {
        self.triggers_by_fact
            .get(fact)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Nodes reachable from `from` along edges and composed calls, `from` included.
    pub fn reachable_nodes(&self, from: NodeRef) -> Vec<NodeRef> {
        let mut out = Vec::new();
        if self.get_node(from).is_none() {
            return out;
        }
        let mut dfs = Dfs::new(&self.reach, NodeIndex::new(from.0));
        while let Some(idx) = dfs.next(&self.reach) {
            out.push(self.reach[idx]);
        }
        out.sort();
        out
    }

    /// `flow/node` label for logs and error messages.
    pub fn label(&self, node: NodeRef) -> String {
        let node = self.node(node);
        format!("{}/{}", self.flow(node.flow).name, node.name)
    }
}
