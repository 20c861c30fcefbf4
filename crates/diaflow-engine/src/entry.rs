use diaflow_cond::FactStore;
use diaflow_types::{FlowSet, NodeRef};
use log::debug;

use crate::activation::ActivationTable;
use crate::support::{Support, SupportContext, SupportId};

/// One step of a path: the node it activated and the support it registered there.
#[derive(Debug, Clone)]
pub struct Entry {
    node: NodeRef,
    support: Support,
}

impl Entry {
    pub fn new(node: NodeRef, support: Support) -> Self {
        Self { node, support }
    }

    pub fn node(&self) -> NodeRef {
        self.node
    }

    pub fn support(&self) -> &Support {
        &self.support
    }

    /// Drops this entry's support, and any other support of the node, that is no longer valid.
    /// Returns whether the node is still active afterwards.
    pub fn check_support(
        &self,
        flows: &FlowSet,
        facts: &dyn FactStore,
        activation: &mut ActivationTable,
    ) -> bool {
        let Some(state) = activation.get(self.node) else {
            return false;
        };
        let ctx = SupportContext {
            flows,
            facts,
            activation: &*activation,
        };
        let invalid: Vec<SupportId> = state
            .supports()
            .filter(|support| !support.is_valid(&ctx))
            .map(Support::id)
            .collect();
        if !invalid.is_empty() {
            for id in &invalid {
                debug!("dropping invalid {id} from {}", flows.label(self.node));
            }
            activation
                .state_mut(self.node)
                .retain_valid(|support| !invalid.contains(&support.id()));
        }
        activation.is_active(self.node)
    }
}
