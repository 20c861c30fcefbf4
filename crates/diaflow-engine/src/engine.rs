use std::sync::Arc;

use diaflow_cond::{Condition, FactStore};
use diaflow_types::{DefFlowSet, EdgeRef, FlowSet, NodeRef};
use log::{debug, warn};

use crate::action::ActionRegistry;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::indication::{Indication, IndicationContext, IndicationSource, TriggerTable};
use crate::path::PathId;
use crate::registry::FlowRegistry;
use crate::runtime::Runtime;
use crate::session::FlowSession;
use crate::support::{Support, SupportId, SupportKind};

/// What one `propagate` call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    pub rounds: usize,
    /// True if any path collapsed or advanced.
    pub changed: bool,
    /// Paths opened by indications.
    pub started: Vec<PathId>,
    /// Paths dropped from the registry because they became empty.
    pub finished: Vec<PathId>,
}

/// Interprets one flow set for any number of sessions.
pub struct FlowEngine {
    flows: Arc<FlowSet>,
    actions: ActionRegistry,
    indications: Arc<dyn IndicationSource>,
    config: EngineConfig,
}

impl FlowEngine {
    pub fn new(flows: Arc<FlowSet>) -> Self {
        Self {
            flows,
            actions: ActionRegistry::default(),
            indications: Arc::new(TriggerTable),
            config: EngineConfig::default(),
        }
    }

    pub fn from_defs(defs: DefFlowSet) -> Result<Self, EngineError> {
        Ok(Self::new(Arc::new(FlowSet::build(defs)?)))
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_actions(mut self, actions: ActionRegistry) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_indications(mut self, source: impl IndicationSource + 'static) -> Self {
        self.indications = Arc::new(source);
        self
    }

    pub fn flows(&self) -> &Arc<FlowSet> {
        &self.flows
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Creates a session over `facts`, starting every autostart flow when configured to.
    pub fn new_session<F: FactStore>(&self, facts: F) -> Result<FlowSession<F>, EngineError> {
        let mut session = FlowSession::new(facts);
        if self.config.autostart && !self.flows.is_empty() {
            for start in self.flows.autostart_nodes() {
                let support = session.new_support(SupportKind::Valid);
                self.start_flow(&mut session, start, support)?;
            }
            self.propagate(&mut session, &[])?;
        }
        Ok(session)
    }

    /// Activates `start` with `support`. A new path is opened only if the node was inactive.
    pub fn start_flow<F: FactStore>(
        &self,
        session: &mut FlowSession<F>,
        start: NodeRef,
        support: Support,
    ) -> Result<Option<PathId>, EngineError> {
        let (mut rt, registry) = self.split(session);
        let result = rt.start_flow(start, support);
        registry.adopt(rt.truth.take_spawned());
        result
    }

    pub fn start_flow_by_name<F: FactStore>(
        &self,
        session: &mut FlowSession<F>,
        flow: &str,
        start: &str,
        support: Support,
    ) -> Result<Option<PathId>, EngineError> {
        let start = self.find_start_node(flow, start)?;
        self.start_flow(session, start, support)
    }

    pub fn find_start_node(&self, flow: &str, start: &str) -> Result<NodeRef, EngineError> {
        if self.flows.find_flow(flow).is_none() {
            return Err(EngineError::UnknownFlow(flow.to_string()));
        }
        self.flows
            .find_start_node(flow, start)
            .ok_or_else(|| EngineError::UnknownStartNode {
                flow: flow.to_string(),
                start: start.to_string(),
            })
    }

    /// Activates `start` on behalf of `composed` and always opens a new path there.
    pub fn enter_subflow<F: FactStore>(
        &self,
        session: &mut FlowSession<F>,
        composed: NodeRef,
        start: NodeRef,
        support: Support,
    ) -> Result<PathId, EngineError> {
        let (mut rt, registry) = self.split(session);
        let result = rt.enter_subflow(composed, start, support);
        registry.adopt(rt.truth.take_spawned());
        result
    }

    /// Removes a support outside of path collapse. Returns whether it was present.
    pub fn retract_support<F: FactStore>(
        &self,
        session: &mut FlowSession<F>,
        node: NodeRef,
        support: SupportId,
    ) -> bool {
        if self.flows.get_node(node).is_none() {
            warn!("could not remove {support} from {node}: unknown node");
            return false;
        }
        let removed = session.truth.activation.remove_support(node, support);
        if !removed {
            warn!(
                "could not remove {support} from {}: not present",
                self.flows.label(node)
            );
        }
        removed
    }

    /// Brings the session back to a fixpoint after `changed_facts` changed.
    pub fn propagate<F: FactStore>(
        &self,
        session: &mut FlowSession<F>,
        changed_facts: &[&str],
    ) -> Result<PropagationReport, EngineError> {
        let mut report = PropagationReport::default();
        if self.flows.is_empty() {
            return Ok(report);
        }

        let changed: Vec<String> = changed_facts.iter().map(|fact| fact.to_string()).collect();
        self.indicate(session, &changed, &mut report)?;

        let max_rounds = self.config.max_rounds;
        loop {
            if let Some(limit) = max_rounds {
                if report.rounds >= limit {
                    return Err(EngineError::IterationLimit {
                        what: "propagation rounds",
                        limit,
                    });
                }
            }
            report.rounds += 1;

            let mut changed = false;
            for id in session.registry.ids() {
                let (mut rt, registry) = self.split(session);
                let Some(path) = registry.get_mut(id) else {
                    continue;
                };
                let result = path.propagate(&mut rt);
                let empty = path.is_empty();
                registry.adopt(rt.truth.take_spawned());
                changed |= result?;
                if empty {
                    debug!("{id} is empty, dropping it");
                    registry.remove(id);
                    report.finished.push(id);
                }
            }

            let touched = session.truth.take_touched();
            if !touched.is_empty() {
                let before = report.started.len();
                self.indicate(session, &touched, &mut report)?;
                changed |= report.started.len() > before;
            }

            report.changed |= changed;
            if !changed {
                break;
            }
        }
        Ok(report)
    }

    /// Outgoing edges of active nodes whose condition cannot be decided yet.
    pub fn undefined_edges<F: FactStore>(&self, session: &FlowSession<F>) -> Vec<EdgeRef> {
        let mut out = Vec::new();
        for node in session.active_nodes() {
            for &edge in &self.flows.node(node).outgoing {
                if self
                    .flows
                    .edge(edge)
                    .condition
                    .eval(&session.facts)
                    .is_indeterminate()
                {
                    out.push(edge);
                }
            }
        }
        out
    }

    fn indicate<F: FactStore>(
        &self,
        session: &mut FlowSession<F>,
        facts: &[String],
        report: &mut PropagationReport,
    ) -> Result<(), EngineError> {
        for fact in facts {
            let indications = {
                let ctx = IndicationContext {
                    flows: &self.flows,
                    facts: &session.facts,
                    activation: &session.truth.activation,
                };
                self.indications.indications(fact, &ctx)
            };
            for indication in indications {
                let started = match indication {
                    Indication::Start { start, support } => {
                        let support = session.new_support(support);
                        self.start_flow(session, start, support)?
                    }
                    Indication::Subflow {
                        composed,
                        start,
                        support,
                    } => {
                        let support = session.new_support(support);
                        Some(self.enter_subflow(session, composed, start, support)?)
                    }
                };
                report.started.extend(started);
            }
        }
        Ok(())
    }

    fn split<'s, F: FactStore>(
        &'s self,
        session: &'s mut FlowSession<F>,
    ) -> (Runtime<'s>, &'s mut FlowRegistry) {
        let FlowSession {
            facts,
            truth,
            registry,
        } = session;
        (
            Runtime {
                flows: &self.flows,
                actions: &self.actions,
                config: &self.config,
                facts,
                truth,
            },
            registry,
        )
    }
}
