//! Execution strands and their truth maintenance.
//!
//! A path is an ordered list of entries from its origin to its frontier. Each propagation first
//! collapses the parts of the path whose support disappeared (undoing their actions in reverse
//! order) and then extends the frontier along the first satisfied outgoing edge until the path
//! has to wait.

use std::fmt;

use diaflow_cond::Condition;
use diaflow_types::{EdgeRef, NodeKind, NodeRef};
use log::debug;

use crate::entry::Entry;
use crate::error::EngineError;
use crate::runtime::Runtime;
use crate::support::SupportKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathId(pub u64);

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "path#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Path {
    id: PathId,
    entries: Vec<Entry>,
}

enum Step {
    Appended,
    Merged { added: bool },
}

impl Path {
    pub(crate) fn new(id: PathId, origin: Entry) -> Self {
        Self {
            id,
            entries: vec![origin],
        }
    }

    pub fn id(&self) -> PathId {
        self.id
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.entries.iter().map(Entry::node)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first_node(&self) -> Option<NodeRef> {
        self.entries.first().map(Entry::node)
    }

    pub fn frontier(&self) -> Option<NodeRef> {
        self.entries.last().map(Entry::node)
    }

    pub(crate) fn propagate(&mut self, rt: &mut Runtime<'_>) -> Result<bool, EngineError> {
        let collapsed = self.maintain_truth(rt)?;
        let advanced = self.flow(rt)?;
        Ok(collapsed || advanced)
    }

    /// Removes every contiguous run of entries whose node lost its last support.
    pub(crate) fn maintain_truth(&mut self, rt: &mut Runtime<'_>) -> Result<bool, EngineError> {
        let mut ranges = Vec::new();
        let mut idx = 0;
        while idx < self.entries.len() {
            if rt.check_support(&self.entries[idx]) {
                idx += 1;
                continue;
            }
            let from = idx;
            let mut to = idx;
            while to + 1 < self.entries.len() && !rt.check_support(&self.entries[to + 1]) {
                to += 1;
            }
            ranges.push((from, to));
            idx = to + 1;
        }

        let mut removed = 0;
        for &(from, to) in &ranges {
            let (from, to) = (from - removed, to - removed);
            debug!(
                "{} collapsing entries {from}..={to} ({} .. {})",
                self.id,
                rt.flows.label(self.entries[from].node()),
                rt.flows.label(self.entries[to].node())
            );
            for pos in (from..=to).rev() {
                let entry = &self.entries[pos];
                rt.truth
                    .activation
                    .remove_support(entry.node(), entry.support().id());
                let entry = entry.clone();
                rt.undo_action(&entry)?;
                self.entries.remove(pos);
            }
            removed += to - from + 1;
        }
        Ok(!ranges.is_empty())
    }

    /// Extends the frontier along satisfied edges until the path has to wait.
    pub(crate) fn flow(&mut self, rt: &mut Runtime<'_>) -> Result<bool, EngineError> {
        let mut changed = false;
        let mut steps = 0usize;
        while let Some(frontier) = self.frontier() {
            let at_snapshot = matches!(rt.flows.node(frontier).kind, NodeKind::Snapshot);
            if at_snapshot && !self.resumes_here() {
                debug!("{} halting at snapshot {}", self.id, rt.flows.label(frontier));
                break;
            }
            let Some(edge) = select_next_edge(rt, frontier) else {
                debug!("{} staying at {}", self.id, rt.flows.label(frontier));
                break;
            };
            steps += 1;
            if let Some(limit) = rt.config.max_flow_steps {
                if steps > limit {
                    return Err(EngineError::IterationLimit {
                        what: "flow steps",
                        limit,
                    });
                }
            }
            match self.follow(rt, edge)? {
                Step::Appended => changed = true,
                Step::Merged { added } => {
                    changed |= added;
                    break;
                }
            }
        }
        Ok(changed)
    }

    /// A snapshot reached along an edge ends the strand. Only an origin entry that was not
    /// itself reached along an edge resumes from it, even after a collapse moved a reached
    /// snapshot to the front.
    fn resumes_here(&self) -> bool {
        match self.entries.as_slice() {
            [origin] => origin.support().edge().is_none(),
            _ => false,
        }
    }

    fn follow(&mut self, rt: &mut Runtime<'_>, edge_ref: EdgeRef) -> Result<Step, EngineError> {
        let edge = rt.flows.edge(edge_ref);
        let frontier = self.frontier();
        if frontier != Some(edge.source) {
            return Err(EngineError::StructuralViolation(format!(
                "{edge_ref} starts at {} but {} ends at {}",
                rt.flows.label(edge.source),
                self.id,
                frontier.map_or_else(|| "nothing".to_string(), |node| rt.flows.label(node))
            )));
        }

        let target = edge.target;
        if rt.truth.activation.is_active(target) {
            if rt.truth.activation.state_mut(target).has_edge_support(edge_ref) {
                return Ok(Step::Merged { added: false });
            }
            let support = rt.truth.new_support(SupportKind::Edge(edge_ref));
            debug!(
                "{} merging into active {} via {edge_ref}",
                self.id,
                rt.flows.label(target)
            );
            rt.truth.activation.add_support(target, support);
            return Ok(Step::Merged { added: true });
        }

        debug!("{} following {edge_ref} to {}", self.id, rt.flows.label(target));
        let support = rt.truth.new_support(SupportKind::Edge(edge_ref));
        rt.truth.activation.add_support(target, support.clone());
        let entry = Entry::new(target, support);
        self.entries.push(entry.clone());
        if let Err(err) = rt.do_action(&entry) {
            self.entries.pop();
            rt.truth
                .activation
                .remove_support(target, entry.support().id());
            return Err(err);
        }
        Ok(Step::Appended)
    }
}

/// First outgoing edge of `node`, in declaration order, whose condition is satisfied.
fn select_next_edge(rt: &Runtime<'_>, node: NodeRef) -> Option<EdgeRef> {
    rt.flows
        .node(node)
        .outgoing
        .iter()
        .copied()
        .find(|edge| rt.flows.edge(*edge).condition.eval(&*rt.facts).is_satisfied())
}
