use std::fmt;

use diaflow_cond::{Condition, FactStore};
use diaflow_types::{CondExpr, EdgeRef, FlowSet, NodeRef, TriggerRef};

use crate::activation::ActivationTable;

/// Session-unique support identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SupportId(pub u64);

impl fmt::Display for SupportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "support#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SupportKind {
    /// Created by an outside indication; valid while `condition` is satisfied.
    External {
        trigger: Option<TriggerRef>,
        condition: CondExpr,
    },
    /// Never invalidated by truth maintenance.
    Valid,
    /// Valid while the edge's source is active and its condition is satisfied.
    Edge(EdgeRef),
    /// Sub-flow entry made by a composed node; valid while that node is active.
    Node(NodeRef),
}

/// Justification for a node being active. Two supports are equal only if they share an id.
#[derive(Debug, Clone)]
pub struct Support {
    id: SupportId,
    kind: SupportKind,
}

impl PartialEq for Support {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Support {}

impl Support {
    pub(crate) fn new(id: SupportId, kind: SupportKind) -> Self {
        Self { id, kind }
    }

    pub fn id(&self) -> SupportId {
        self.id
    }

    pub fn kind(&self) -> &SupportKind {
        &self.kind
    }

    pub fn edge(&self) -> Option<EdgeRef> {
        match self.kind {
            SupportKind::Edge(edge) => Some(edge),
            _ => None,
        }
    }

    pub fn is_valid(&self, ctx: &SupportContext<'_>) -> bool {
        match &self.kind {
            SupportKind::Valid => true,
            SupportKind::External { condition, .. } => condition.eval(ctx.facts).is_satisfied(),
            SupportKind::Edge(edge) => {
                let edge = ctx.flows.edge(*edge);
                ctx.activation.is_active(edge.source) && edge.condition.eval(ctx.facts).is_satisfied()
            }
            SupportKind::Node(composed) => ctx.activation.is_active(*composed),
        }
    }
}

/// Read-only view used to judge support validity.
pub struct SupportContext<'a> {
    pub flows: &'a FlowSet,
    pub facts: &'a dyn FactStore,
    pub activation: &'a ActivationTable,
}
