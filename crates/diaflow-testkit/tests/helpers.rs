//! Shared flow fixtures for the integration tests.
//!
//! Each integration test compiles this module separately, so some functions may appear unused in
//! certain test binaries.

#![allow(dead_code)]

use std::sync::Arc;

use diaflow_engine::{ActionRegistry, FlowEngine};
use diaflow_testkit::{FlowBuilder, RecordingAction, flow_set};
use diaflow_types::CondExpr;

pub fn yes(fact: &str) -> CondExpr {
    CondExpr::equals(fact, "yes")
}

/// `S --Q1--> A --Q2--> B`, where `A` sets `F_A` and `B` sets `F_B`.
pub fn flag_engine() -> anyhow::Result<FlowEngine> {
    let main = FlowBuilder::new("Main")
        .start("S")
        .assign("A", "F_A", true)
        .assign("B", "F_B", true)
        .edge_when("S", "A", yes("Q1"))
        .edge_when("A", "B", yes("Q2"))
        .build();
    Ok(FlowEngine::new(flow_set(vec![main], vec![])?))
}

/// Engine whose `rec` action is the returned recorder.
pub fn recording_engine(
    flows: Vec<diaflow_types::DefFlow>,
    triggers: Vec<diaflow_types::DefTrigger>,
) -> anyhow::Result<(FlowEngine, Arc<RecordingAction>)> {
    let recorder = RecordingAction::new();
    let actions = ActionRegistry::new().with("rec", recorder.clone());
    let engine = FlowEngine::new(flow_set(flows, triggers)?).with_actions(actions);
    Ok((engine, recorder))
}

/// `Main: S --Q=go--> C` where `C` calls `Sub: Begin -> X -> End(snapshot)`.
pub fn subflow_defs() -> Vec<diaflow_types::DefFlow> {
    let main = FlowBuilder::new("Main")
        .start("S")
        .composed("C", "Sub", "Begin")
        .edge_when("S", "C", CondExpr::equals("Q", "go"))
        .build();
    let sub = FlowBuilder::new("Sub")
        .start("Begin")
        .invoke("X", "rec")
        .snapshot("End")
        .invoke("After", "rec")
        .edge("Begin", "X")
        .edge("X", "End")
        .edge("End", "After")
        .build();
    vec![main, sub]
}

pub const FLAG_FLOWS_JSON: &str = r#"{
    "flows": [{
        "name": "Main",
        "nodes": [
            { "name": "S", "kind": "start" },
            { "name": "A", "kind": "action", "action": { "type": "assign", "fact": "F_A", "value": { "bool": true } } },
            { "name": "B", "kind": "action", "action": { "type": "assign", "fact": "F_B", "value": { "bool": true } } }
        ],
        "edges": [
            { "from": "S", "to": "A", "when": { "op": "equals", "fact": "Q1", "value": { "text": "yes" } } },
            { "from": "A", "to": "B", "when": { "op": "equals", "fact": "Q2", "value": { "text": "yes" } } }
        ]
    }],
    "triggers": [
        { "name": "interview", "flow": "Main", "start": "S", "when": { "op": "known", "fact": "Q0" } }
    ]
}"#;
