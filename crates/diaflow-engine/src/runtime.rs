use diaflow_cond::{FactState, FactStore};
use diaflow_types::{DefAction, FlowSet, NodeKind, NodeRef};
use log::{debug, info};

use crate::action::ActionRegistry;
use crate::config::EngineConfig;
use crate::entry::Entry;
use crate::error::EngineError;
use crate::path::{Path, PathId};
use crate::session::TruthState;
use crate::support::{Support, SupportKind};

/// Mutable view of one session together with the engine's immutable parts.
pub(crate) struct Runtime<'a> {
    pub flows: &'a FlowSet,
    pub actions: &'a ActionRegistry,
    pub config: &'a EngineConfig,
    pub facts: &'a mut dyn FactStore,
    pub truth: &'a mut TruthState,
}

impl Runtime<'_> {
    pub fn check_support(&mut self, entry: &Entry) -> bool {
        entry.check_support(self.flows, &*self.facts, &mut self.truth.activation)
    }

    /// Adds `support` to `start`; opens a path only if the node was not active before.
    pub fn start_flow(
        &mut self,
        start: NodeRef,
        support: Support,
    ) -> Result<Option<PathId>, EngineError> {
        self.require_origin(start)?;
        let was_active = self.truth.activation.is_active(start);
        self.truth.activation.add_support(start, support.clone());
        if was_active {
            debug!(
                "{} already active, adding {} without a new path",
                self.flows.label(start),
                support.id()
            );
            return Ok(None);
        }
        info!("starting flow at {}", self.flows.label(start));
        self.open_path(start, support).map(Some)
    }

    /// Adds `support` to `start` and always opens a new path there.
    pub fn enter_subflow(
        &mut self,
        composed: NodeRef,
        start: NodeRef,
        support: Support,
    ) -> Result<PathId, EngineError> {
        let caller = self
            .flows
            .get_node(composed)
            .ok_or(EngineError::UnknownNode(composed))?;
        if !matches!(caller.kind, NodeKind::Composed { .. }) {
            return Err(EngineError::NotComposed(self.flows.label(composed)));
        }
        self.require_origin(start)?;
        info!(
            "{} entering sub-flow at {}",
            self.flows.label(composed),
            self.flows.label(start)
        );
        self.truth.activation.add_support(start, support.clone());
        self.open_path(start, support)
    }

    fn require_origin(&self, node: NodeRef) -> Result<(), EngineError> {
        let origin = self
            .flows
            .get_node(node)
            .ok_or(EngineError::UnknownNode(node))?;
        if origin.kind.is_origin() {
            Ok(())
        } else {
            Err(EngineError::NotAnOrigin(self.flows.label(node)))
        }
    }

    fn open_path(&mut self, origin: NodeRef, support: Support) -> Result<PathId, EngineError> {
        let id = self.truth.next_path_id();
        let entry = Entry::new(origin, support);
        if let Err(err) = self.do_action(&entry) {
            self.truth
                .activation
                .remove_support(origin, entry.support().id());
            return Err(err);
        }
        self.truth.spawned.push(Path::new(id, entry));
        Ok(id)
    }

    pub fn do_action(&mut self, entry: &Entry) -> Result<(), EngineError> {
        let (flows, actions) = (self.flows, self.actions);
        let node_ref = entry.node();
        let node = flows.node(node_ref);
        match &node.kind {
            NodeKind::Start => {}
            NodeKind::Snapshot => {
                self.truth.snapshots.insert(node_ref);
            }
            NodeKind::Action(DefAction::Noop) => {}
            NodeKind::Action(DefAction::Assign { fact, value }) => {
                let previous = self
                    .facts
                    .put(fact, FactState::Answered(value.clone()));
                self.truth.assigned.insert(node_ref, previous);
                self.truth.touched.push(fact.clone());
            }
            NodeKind::Action(DefAction::Invoke { name }) => {
                let action = actions
                    .get(name)
                    .ok_or_else(|| EngineError::UnknownAction(name.clone()))?;
                action
                    .do_action(node, &mut *self.facts)
                    .map_err(|source| EngineError::Action {
                        node: flows.label(node_ref),
                        source,
                    })?;
            }
            NodeKind::Composed { called } => {
                let called = *called;
                let support = self.truth.new_support(SupportKind::Node(node_ref));
                let support_id = support.id();
                self.enter_subflow(node_ref, called, support)?;
                self.truth.subflows.insert(node_ref, (called, support_id));
            }
        }
        Ok(())
    }

    pub fn undo_action(&mut self, entry: &Entry) -> Result<(), EngineError> {
        let (flows, actions) = (self.flows, self.actions);
        let node_ref = entry.node();
        let node = flows.node(node_ref);
        match &node.kind {
            NodeKind::Start | NodeKind::Action(DefAction::Noop) => {}
            NodeKind::Snapshot => {
                self.truth.snapshots.shift_remove(&node_ref);
            }
            NodeKind::Action(DefAction::Assign { fact, .. }) => {
                if let Some(previous) = self.truth.assigned.remove(&node_ref) {
                    self.facts.put(fact, previous);
                    self.truth.touched.push(fact.clone());
                }
            }
            NodeKind::Action(DefAction::Invoke { name }) => {
                let action = actions
                    .get(name)
                    .ok_or_else(|| EngineError::UnknownAction(name.clone()))?;
                action
                    .undo_action(node, &mut *self.facts)
                    .map_err(|source| EngineError::Action {
                        node: flows.label(node_ref),
                        source,
                    })?;
            }
            NodeKind::Composed { .. } => {
                if let Some((start, support_id)) = self.truth.subflows.remove(&node_ref) {
                    let removed = self.truth.activation.remove_support(start, support_id);
                    debug!(
                        "{} retracting sub-flow support {} from {} (present: {removed})",
                        flows.label(node_ref),
                        support_id,
                        flows.label(start)
                    );
                }
            }
        }
        Ok(())
    }
}
