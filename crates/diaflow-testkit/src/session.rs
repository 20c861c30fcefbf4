use anyhow::{Context, anyhow};
use diaflow_cond::{FactState, FactStore, MemFactStore};
use diaflow_engine::{FlowEngine, FlowSession, PathId, PropagationReport, SupportKind};
use diaflow_types::{FactValue, NodeRef};
use log::debug;

use crate::fixtures::init_logging;

/// An engine driving one in-memory session; fact changes propagate immediately.
pub struct TestSession {
    pub engine: FlowEngine,
    pub session: FlowSession<MemFactStore>,
}

impl TestSession {
    pub fn new(engine: FlowEngine) -> anyhow::Result<Self> {
        Self::with_facts(engine, MemFactStore::new())
    }

    pub fn with_facts(engine: FlowEngine, facts: MemFactStore) -> anyhow::Result<Self> {
        init_logging();
        let session = engine.new_session(facts).context("create session")?;
        Ok(Self { engine, session })
    }

    pub fn answer(
        &mut self,
        fact: &str,
        value: impl Into<FactValue>,
    ) -> anyhow::Result<PropagationReport> {
        self.session.facts_mut().answer(fact, value);
        self.propagate(fact)
    }

    pub fn mark_unknown(&mut self, fact: &str) -> anyhow::Result<PropagationReport> {
        self.session.facts_mut().mark_unknown(fact);
        self.propagate(fact)
    }

    pub fn retract(&mut self, fact: &str) -> anyhow::Result<PropagationReport> {
        self.session.facts_mut().retract(fact);
        self.propagate(fact)
    }

    fn propagate(&mut self, fact: &str) -> anyhow::Result<PropagationReport> {
        let report = self.engine.propagate(&mut self.session, &[fact])?;
        debug!("propagated {fact}: {report:?}");
        Ok(report)
    }

    /// Starts `flow`/`start` with an unconditional support.
    pub fn start(&mut self, flow: &str, start: &str) -> anyhow::Result<Option<PathId>> {
        let support = self.session.new_support(SupportKind::Valid);
        let path = self
            .engine
            .start_flow_by_name(&mut self.session, flow, start, support)?;
        self.engine.propagate(&mut self.session, &[])?;
        Ok(path)
    }

    pub fn node(&self, flow: &str, name: &str) -> anyhow::Result<NodeRef> {
        self.engine
            .flows()
            .find_node(flow, name)
            .ok_or_else(|| anyhow!("no node {flow}/{name}"))
    }

    pub fn is_active(&self, flow: &str, name: &str) -> bool {
        self.node(flow, name)
            .is_ok_and(|node| self.session.is_active(node))
    }

    pub fn fact(&self, fact: &str) -> FactState {
        self.session.facts().get(fact)
    }

    /// `flow/node` labels of every active node.
    pub fn active_labels(&self) -> Vec<String> {
        self.labels(self.session.active_nodes())
    }

    /// Node names of each live path, in registry order.
    pub fn path_names(&self) -> Vec<Vec<String>> {
        let flows = self.engine.flows();
        self.session
            .paths()
            .map(|path| {
                path.nodes()
                    .map(|node| flows.node(node).name.clone())
                    .collect()
            })
            .collect()
    }

    pub fn snapshot_labels(&self) -> Vec<String> {
        self.labels(self.session.reached_snapshots())
    }

    fn labels(&self, nodes: Vec<NodeRef>) -> Vec<String> {
        let flows = self.engine.flows();
        nodes.into_iter().map(|node| flows.label(node)).collect()
    }
}
