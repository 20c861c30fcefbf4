use diaflow_cond::{Condition, FactStore};
use diaflow_types::{FlowSet, NodeRef};
use log::debug;

use crate::activation::ActivationTable;
use crate::support::SupportKind;

/// Request to activate a path origin, produced in response to a fact change.
#[derive(Debug, Clone, PartialEq)]
pub enum Indication {
    Start {
        start: NodeRef,
        support: SupportKind,
    },
    Subflow {
        composed: NodeRef,
        start: NodeRef,
        support: SupportKind,
    },
}

pub struct IndicationContext<'a> {
    pub flows: &'a FlowSet,
    pub facts: &'a dyn FactStore,
    pub activation: &'a ActivationTable,
}

/// Decides which flows to indicate when a fact changes.
pub trait IndicationSource: Send + Sync {
    fn indications(&self, fact: &str, ctx: &IndicationContext<'_>) -> Vec<Indication>;
}

/// Never indicates anything; flows are started explicitly by the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIndications;

impl IndicationSource for NoIndications {
    fn indications(&self, _fact: &str, _ctx: &IndicationContext<'_>) -> Vec<Indication> {
        Vec::new()
    }
}

/// Evaluates the triggers compiled into the flow set.
///
/// A trigger reading the changed fact indicates its start node with an `External` support
/// carrying the trigger condition, unless the node already holds a support from that trigger.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerTable;

impl IndicationSource for TriggerTable {
    fn indications(&self, fact: &str, ctx: &IndicationContext<'_>) -> Vec<Indication> {
        let mut out = Vec::new();
        for &trigger_ref in ctx.flows.triggers_reading(fact) {
            let trigger = ctx.flows.trigger(trigger_ref);
            if !trigger.when.eval(ctx.facts).is_satisfied() {
                continue;
            }
            let already_supported = ctx.activation.get(trigger.start).is_some_and(|state| {
                state.supports().any(|support| {
                    matches!(
                        support.kind(),
                        SupportKind::External { trigger: Some(existing), .. } if *existing == trigger_ref
                    )
                })
            });
            if already_supported {
                debug!("trigger {} already supports {}", trigger.name, ctx.flows.label(trigger.start));
                continue;
            }
            out.push(Indication::Start {
                start: trigger.start,
                support: SupportKind::External {
                    trigger: Some(trigger_ref),
                    condition: trigger.when.clone(),
                },
            });
        }
        out
    }
}
