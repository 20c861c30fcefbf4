//! Builders for flow definitions and host actions used across the integration tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, Once};

use diaflow_cond::FactStore;
use diaflow_engine::{ActionError, NodeAction};
use diaflow_types::{
    CondExpr, DefAction, DefEdge, DefFlow, DefFlowSet, DefNode, DefTrigger, FactValue, FlowSet,
    Node,
};

/// Installs `env_logger` once per test binary. `RUST_LOG` controls the filter.
pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .is_test(true)
            .try_init();
    });
}

/// Fluent builder for a single [`DefFlow`].
pub struct FlowBuilder {
    flow: DefFlow,
}

impl FlowBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            flow: DefFlow::new(name),
        }
    }

    pub fn autostart(mut self) -> Self {
        self.flow.autostart = true;
        self
    }

    pub fn start(mut self, name: &str) -> Self {
        self.flow.nodes.push(DefNode::start(name));
        self
    }

    pub fn noop(mut self, name: &str) -> Self {
        self.flow.nodes.push(DefNode::action(name, DefAction::Noop));
        self
    }

    /// Node setting `fact` to `value` while active.
    pub fn assign(mut self, name: &str, fact: &str, value: impl Into<FactValue>) -> Self {
        self.flow.nodes.push(DefNode::action(
            name,
            DefAction::Assign {
                fact: fact.into(),
                value: value.into(),
            },
        ));
        self
    }

    /// Node running the host action registered as `action`.
    pub fn invoke(mut self, name: &str, action: &str) -> Self {
        self.flow.nodes.push(DefNode::action(
            name,
            DefAction::Invoke {
                name: action.into(),
            },
        ));
        self
    }

    pub fn composed(mut self, name: &str, flow: &str, start: &str) -> Self {
        self.flow.nodes.push(DefNode::composed(name, flow, start));
        self
    }

    pub fn snapshot(mut self, name: &str) -> Self {
        self.flow.nodes.push(DefNode::snapshot(name));
        self
    }

    pub fn edge(mut self, from: &str, to: &str) -> Self {
        self.flow.edges.push(DefEdge::new(from, to));
        self
    }

    pub fn edge_when(mut self, from: &str, to: &str, when: CondExpr) -> Self {
        self.flow.edges.push(DefEdge::new(from, to).when(when));
        self
    }

    pub fn build(self) -> DefFlow {
        self.flow
    }
}

pub fn trigger(name: &str, flow: &str, start: &str, when: CondExpr) -> DefTrigger {
    DefTrigger {
        name: name.into(),
        flow: flow.into(),
        start: start.into(),
        when,
    }
}

/// Compiles definitions into a shared flow set.
pub fn flow_set(flows: Vec<DefFlow>, triggers: Vec<DefTrigger>) -> anyhow::Result<Arc<FlowSet>> {
    Ok(Arc::new(FlowSet::build(DefFlowSet { flows, triggers })?))
}

/// Host action that records `do:<node>` / `undo:<node>` and can be told to fail on given nodes.
#[derive(Default)]
pub struct RecordingAction {
    events: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingAction {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_on(&self, node: &str) {
        self.failing.lock().unwrap().insert(node.to_string());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    fn record(&self, kind: &str, node: &Node) -> Result<(), ActionError> {
        if self.failing.lock().unwrap().contains(&node.name) {
            return Err(ActionError::Rejected {
                node: node.name.clone(),
                reason: format!("{kind} refused"),
            });
        }
        self.events
            .lock()
            .unwrap()
            .push(format!("{kind}:{}", node.name));
        Ok(())
    }
}

impl NodeAction for RecordingAction {
    fn do_action(&self, node: &Node, _facts: &mut dyn FactStore) -> Result<(), ActionError> {
        self.record("do", node)
    }

    fn undo_action(&self, node: &Node, _facts: &mut dyn FactStore) -> Result<(), ActionError> {
        self.record("undo", node)
    }
}
