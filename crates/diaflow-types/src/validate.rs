use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::{CondExpr, DefFlow, DefFlowSet, DefNodeKind, Name};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("flow {flow} must contain at least one node")]
    EmptyFlow { flow: Name },
    #[error("duplicate flow name {flow}")]
    DuplicateFlow { flow: Name },
    #[error("flow {flow} has duplicate node name {node}")]
    DuplicateNode { flow: Name, node: Name },
    #[error("flow {flow} edge references unknown node {node}")]
    EdgeReferencesUnknownNode { flow: Name, node: Name },
    #[error("flow {flow} has no start node")]
    MissingStartNode { flow: Name },
    #[error("flow {flow} node {node} calls unknown flow {called}")]
    UnknownCalledFlow { flow: Name, node: Name, called: Name },
    #[error("flow {flow} node {node} calls {called_flow}/{start}, which is not a start node")]
    UnknownCalledStart {
        flow: Name,
        node: Name,
        called_flow: Name,
        start: Name,
    },
    #[error("trigger {trigger} indicates {flow}/{start}, which is not a start node")]
    UnknownTriggerTarget {
        trigger: Name,
        flow: Name,
        start: Name,
    },
    #[error("{context}: min_of bounds min={min} max={max:?} do not fit {len} terms")]
    InvalidMinOf {
        context: String,
        min: usize,
        max: Option<usize>,
        len: usize,
    },
}

/// Checks the parts of a flow that do not depend on other flows.
pub fn validate_flow(flow: &DefFlow) -> Result<(), ValidationError> {
    if flow.nodes.is_empty() {
        return Err(ValidationError::EmptyFlow {
            flow: flow.name.clone(),
        });
    }

    let mut names = HashSet::new();
    for node in &flow.nodes {
        if !names.insert(node.name.as_str()) {
            return Err(ValidationError::DuplicateNode {
                flow: flow.name.clone(),
                node: node.name.clone(),
            });
        }
    }

    if !flow
        .nodes
        .iter()
        .any(|node| matches!(node.kind, DefNodeKind::Start))
    {
        return Err(ValidationError::MissingStartNode {
            flow: flow.name.clone(),
        });
    }

    for edge in &flow.edges {
        for endpoint in [&edge.from, &edge.to] {
            if !names.contains(endpoint.as_str()) {
                return Err(ValidationError::EdgeReferencesUnknownNode {
                    flow: flow.name.clone(),
                    node: endpoint.clone(),
                });
            }
        }
        if let Some(cond) = &edge.when {
            validate_condition(cond, &format!("flow {} edge {}->{}", flow.name, edge.from, edge.to))?;
        }
    }

    Ok(())
}

/// Validates every flow, then the cross-flow references of composed nodes and triggers.
pub fn validate_flow_set(set: &DefFlowSet) -> Result<(), ValidationError> {
    let mut start_nodes: HashMap<&str, HashSet<&str>> = HashMap::new();
    for flow in &set.flows {
        validate_flow(flow)?;
        if start_nodes.contains_key(flow.name.as_str()) {
            return Err(ValidationError::DuplicateFlow {
                flow: flow.name.clone(),
            });
        }
        let starts = flow
            .nodes
            .iter()
            .filter(|node| matches!(node.kind, DefNodeKind::Start))
            .map(|node| node.name.as_str())
            .collect();
        start_nodes.insert(flow.name.as_str(), starts);
    }

    for flow in &set.flows {
        for node in &flow.nodes {
            let DefNodeKind::Composed {
                flow: called,
                start,
            } = &node.kind
            else {
                continue;
            };
            let Some(starts) = start_nodes.get(called.as_str()) else {
                return Err(ValidationError::UnknownCalledFlow {
                    flow: flow.name.clone(),
                    node: node.name.clone(),
                    called: called.clone(),
                });
            };
            if !starts.contains(start.as_str()) {
                return Err(ValidationError::UnknownCalledStart {
                    flow: flow.name.clone(),
                    node: node.name.clone(),
                    called_flow: called.clone(),
                    start: start.clone(),
                });
            }
        }
    }

    for trigger in &set.triggers {
        let known = start_nodes
            .get(trigger.flow.as_str())
            .is_some_and(|starts| starts.contains(trigger.start.as_str()));
        if !known {
            return Err(ValidationError::UnknownTriggerTarget {
                trigger: trigger.name.clone(),
                flow: trigger.flow.clone(),
                start: trigger.start.clone(),
            });
        }
        validate_condition(&trigger.when, &format!("trigger {}", trigger.name))?;
    }

    Ok(())
}

fn validate_condition(cond: &CondExpr, context: &str) -> Result<(), ValidationError> {
    match cond {
        CondExpr::MinOf { min, max, of } => {
            let len = of.len();
            let max_ok = max.is_none_or(|max| max >= *min && max <= len);
            if *min > len || !max_ok {
                return Err(ValidationError::InvalidMinOf {
                    context: context.to_string(),
                    min: *min,
                    max: *max,
                    len,
                });
            }
            of.iter().try_for_each(|term| validate_condition(term, context))
        }
        CondExpr::And { all: terms } | CondExpr::Or { any: terms } => {
            terms.iter().try_for_each(|term| validate_condition(term, context))
        }
        CondExpr::Not { cond } => validate_condition(cond, context),
        _ => Ok(()),
    }
}
