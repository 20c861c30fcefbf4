use std::sync::{Arc, Mutex};

use diaflow_cond::{FactStore, MemFactStore};
use diaflow_types::{
    CondExpr, DefAction, DefEdge, DefFlow, DefFlowSet, DefNode, FlowSet, Node, NodeRef,
};

use crate::action::{ActionError, ActionRegistry, NodeAction};
use crate::config::EngineConfig;
use crate::path::{Path, PathId};
use crate::runtime::Runtime;
use crate::session::TruthState;
use crate::support::SupportKind;

pub fn node(flows: &FlowSet, name: &str) -> NodeRef {
    flows
        .nodes()
        .find(|(_, node)| node.name == name)
        .map(|(node_ref, _)| node_ref)
        .unwrap_or_else(|| panic!("no node named {name}"))
}

fn rec(name: &str) -> DefNode {
    DefNode::action(name, DefAction::Invoke { name: "rec".into() })
}

/// `S -> N0 -> .. -> N{len-1}` in flow `Main`; `guard(from, to)` supplies edge conditions.
pub fn chain_flows_when(len: usize, guard: impl Fn(&str, &str) -> Option<CondExpr>) -> FlowSet {
    let mut flow = DefFlow::new("Main");
    flow.nodes.push(DefNode::start("S"));
    let mut prev = "S".to_string();
    for idx in 0..len {
        let name = format!("N{idx}");
        flow.nodes.push(rec(&name));
        flow.edges.push(DefEdge {
            from: prev.clone(),
            to: name.clone(),
            when: guard(&prev, &name),
        });
        prev = name;
    }
    FlowSet::build(DefFlowSet {
        flows: vec![flow],
        triggers: vec![],
    })
    .unwrap()
}

pub fn chain_flows(len: usize) -> FlowSet {
    chain_flows_when(len, |_, _| None)
}

/// `S -> A -> J`, `S -> B -> J`.
pub fn diamond_flows() -> FlowSet {
    let mut flow = DefFlow::new("Main");
    flow.nodes = vec![DefNode::start("S"), rec("A"), rec("B"), rec("J")];
    flow.edges = vec![
        DefEdge::new("S", "A"),
        DefEdge::new("S", "B"),
        DefEdge::new("A", "J"),
        DefEdge::new("B", "J"),
    ];
    FlowSet::build(DefFlowSet {
        flows: vec![flow],
        triggers: vec![],
    })
    .unwrap()
}

#[derive(Default)]
pub struct Recorder {
    log: Mutex<Vec<String>>,
}

impl NodeAction for Recorder {
    fn do_action(&self, node: &Node, _facts: &mut dyn FactStore) -> Result<(), ActionError> {
        self.log.lock().unwrap().push(format!("do:{}", node.name));
        Ok(())
    }

    fn undo_action(&self, node: &Node, _facts: &mut dyn FactStore) -> Result<(), ActionError> {
        self.log.lock().unwrap().push(format!("undo:{}", node.name));
        Ok(())
    }
}

/// Session state without an engine, for driving paths directly.
pub struct Harness {
    pub flows: FlowSet,
    pub actions: ActionRegistry,
    pub config: EngineConfig,
    pub facts: MemFactStore,
    pub truth: TruthState,
    pub recorder: Arc<Recorder>,
}

impl Harness {
    pub fn new(flows: FlowSet) -> Self {
        let recorder = Arc::new(Recorder::default());
        let actions = ActionRegistry::new().with("rec", recorder.clone());
        Self {
            flows,
            actions,
            config: EngineConfig::default(),
            facts: MemFactStore::new(),
            truth: TruthState::default(),
            recorder,
        }
    }

    pub fn rt(&mut self) -> Runtime<'_> {
        Runtime {
            flows: &self.flows,
            actions: &self.actions,
            config: &self.config,
            facts: &mut self.facts,
            truth: &mut self.truth,
        }
    }

    pub fn start(&mut self, name: &str) -> PathId {
        self.start_with(name, SupportKind::Valid)
    }

    pub fn start_external(&mut self, name: &str, condition: CondExpr) -> PathId {
        self.start_with(
            name,
            SupportKind::External {
                trigger: None,
                condition,
            },
        )
    }

    fn start_with(&mut self, name: &str, kind: SupportKind) -> PathId {
        let start = node(&self.flows, name);
        let support = self.truth.new_support(kind);
        self.rt().start_flow(start, support).unwrap().unwrap()
    }

    pub fn take_path(&mut self, id: PathId) -> Path {
        let pos = self
            .truth
            .spawned
            .iter()
            .position(|path| path.id() == id)
            .unwrap();
        self.truth.spawned.remove(pos)
    }

    pub fn names(&self, path: &Path) -> Vec<String> {
        path.nodes()
            .map(|node| self.flows.node(node).name.clone())
            .collect()
    }

    pub fn log(&self) -> Vec<String> {
        self.recorder.log.lock().unwrap().clone()
    }

    pub fn clear_log(&self) {
        self.recorder.log.lock().unwrap().clear();
    }
}
