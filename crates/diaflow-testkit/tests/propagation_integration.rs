mod helpers;

use diaflow_cond::{FactState, FactStore};
use diaflow_engine::{FlowEngine, SupportKind};
use diaflow_testkit::{FlowBuilder, TestSession, flow_set};
use diaflow_types::{DefFlowSet, FactValue};
use helpers::{flag_engine, recording_engine, yes};

fn flag(value: bool) -> FactState {
    FactState::Answered(FactValue::from(value))
}

#[test]
fn flags_follow_their_justification() -> anyhow::Result<()> {
    let mut t = TestSession::new(flag_engine()?)?;
    t.start("Main", "S")?;
    assert_eq!(t.active_labels(), vec!["Main/S"]);
    assert_eq!(t.fact("F_A"), FactState::Unanswered);

    t.answer("Q1", "yes")?;
    assert!(t.is_active("Main", "A"));
    assert!(!t.is_active("Main", "B"));
    assert_eq!(t.fact("F_A"), flag(true));

    t.answer("Q2", "yes")?;
    assert_eq!(t.active_labels(), vec!["Main/S", "Main/A", "Main/B"]);
    assert_eq!(t.fact("F_B"), flag(true));
    assert_eq!(t.path_names(), vec![vec!["S", "A", "B"]]);

    // Losing Q1 retracts A and everything behind it.
    t.answer("Q1", "no")?;
    assert_eq!(t.active_labels(), vec!["Main/S"]);
    assert_eq!(t.fact("F_A"), FactState::Unanswered);
    assert_eq!(t.fact("F_B"), FactState::Unanswered);
    assert_eq!(t.path_names(), vec![vec!["S"]]);

    // Q2 still holds, so restoring Q1 walks both edges again.
    t.answer("Q1", "yes")?;
    assert_eq!(t.path_names(), vec![vec!["S", "A", "B"]]);
    assert_eq!(t.fact("F_B"), flag(true));
    Ok(())
}

#[test]
fn unknown_answer_blocks_a_guard() -> anyhow::Result<()> {
    let mut t = TestSession::new(flag_engine()?)?;
    t.start("Main", "S")?;
    t.answer("Q1", "yes")?;
    t.mark_unknown("Q2")?;
    assert!(!t.is_active("Main", "B"));
    let open: Vec<_> = t
        .engine
        .undefined_edges(&t.session)
        .into_iter()
        .map(|edge| t.engine.flows().label(t.engine.flows().edge(edge).target))
        .collect();
    assert_eq!(open, vec!["Main/B"]);
    Ok(())
}

#[test]
fn assign_restores_previous_answer() -> anyhow::Result<()> {
    let mut facts = diaflow_cond::MemFactStore::new();
    facts.answer("F_A", false);
    let mut t = TestSession::with_facts(flag_engine()?, facts)?;
    t.start("Main", "S")?;
    t.answer("Q1", "yes")?;
    assert_eq!(t.fact("F_A"), flag(true));
    t.retract("Q1")?;
    assert_eq!(t.fact("F_A"), flag(false));

    let facts = t.session.into_facts();
    assert_eq!(facts.get("F_A"), flag(false));
    assert_eq!(facts.get("F_B"), FactState::Unanswered);
    Ok(())
}

#[test]
fn empty_propagation_is_idempotent() -> anyhow::Result<()> {
    let mut t = TestSession::new(flag_engine()?)?;
    t.start("Main", "S")?;
    t.answer("Q1", "yes")?;
    t.answer("Q2", "yes")?;
    let before = t.path_names();
    let facts_before: Vec<_> = ["F_A", "F_B"].iter().map(|f| t.fact(f)).collect();

    for _ in 0..3 {
        let report = t.engine.propagate(&mut t.session, &[])?;
        assert!(!report.changed);
        assert_eq!(report.rounds, 1);
    }
    assert_eq!(t.path_names(), before);
    let facts_after: Vec<_> = ["F_A", "F_B"].iter().map(|f| t.fact(f)).collect();
    assert_eq!(facts_after, facts_before);
    Ok(())
}

#[test]
fn collapse_undoes_in_reverse_order() -> anyhow::Result<()> {
    // Six entries S, N1..N5; the guard on N1 -> N2 drops entries 2..=5.
    let main = FlowBuilder::new("Main")
        .start("S")
        .invoke("N1", "rec")
        .invoke("N2", "rec")
        .invoke("N3", "rec")
        .invoke("N4", "rec")
        .invoke("N5", "rec")
        .edge("S", "N1")
        .edge_when("N1", "N2", yes("keep"))
        .edge("N2", "N3")
        .edge("N3", "N4")
        .edge("N4", "N5")
        .build();
    let (engine, recorder) = recording_engine(vec![main], vec![])?;
    let mut t = TestSession::new(engine)?;
    t.session.facts_mut().answer("keep", "yes");
    t.start("Main", "S")?;
    assert_eq!(t.path_names()[0].len(), 6);
    recorder.clear();

    t.answer("keep", "no")?;
    assert_eq!(
        recorder.events(),
        vec!["undo:N5", "undo:N4", "undo:N3", "undo:N2"]
    );
    assert_eq!(t.path_names(), vec![vec!["S", "N1"]]);
    Ok(())
}

#[test]
fn first_satisfied_edge_wins() -> anyhow::Result<()> {
    let main = FlowBuilder::new("Main")
        .start("S")
        .noop("A")
        .noop("B")
        .noop("C")
        .edge_when("S", "A", yes("pick_a"))
        .edge("S", "B")
        .edge("S", "C")
        .build();
    let engine = FlowEngine::new(flow_set(vec![main], vec![])?);

    let mut t = TestSession::new(engine)?;
    t.start("Main", "S")?;
    // The first edge is undecided, so the unconditional second edge is taken.
    assert_eq!(t.path_names(), vec![vec!["S", "B"]]);

    let mut facts = diaflow_cond::MemFactStore::new();
    facts.answer("pick_a", "yes");
    let engine = FlowEngine::new(t.engine.flows().clone());
    let mut chosen = TestSession::with_facts(engine, facts)?;
    chosen.start("Main", "S")?;
    assert_eq!(chosen.path_names(), vec![vec!["S", "A"]]);
    Ok(())
}

#[test]
fn merging_strands_never_activate_twice() -> anyhow::Result<()> {
    let main = FlowBuilder::new("Main")
        .start("S1")
        .start("S2")
        .invoke("J", "rec")
        .edge("S1", "J")
        .edge("S2", "J")
        .build();
    let (engine, recorder) = recording_engine(vec![main], vec![])?;
    let mut t = TestSession::new(engine)?;
    let s1 = t.node("Main", "S1")?;
    let s2 = t.node("Main", "S2")?;
    let j = t.node("Main", "J")?;

    let first = t.session.new_support(SupportKind::Valid);
    let first_id = first.id();
    t.engine.start_flow(&mut t.session, s1, first)?;
    let second = t.session.new_support(SupportKind::Valid);
    let second_id = second.id();
    t.engine.start_flow(&mut t.session, s2, second)?;
    t.engine.propagate(&mut t.session, &[])?;

    assert_eq!(recorder.events(), vec!["do:J"]);
    assert_eq!(t.path_names(), vec![vec!["S1", "J"], vec!["S2"]]);
    assert_eq!(t.session.activation().get(j).unwrap().supports().count(), 2);

    // J keeps its merged support from S2.
    assert!(t.engine.retract_support(&mut t.session, s1, first_id));
    t.engine.propagate(&mut t.session, &[])?;
    assert!(t.session.is_active(j));
    assert_eq!(recorder.events(), vec!["do:J"]);
    assert_eq!(t.path_names(), vec![vec!["J"], vec!["S2"]]);

    assert!(t.engine.retract_support(&mut t.session, s2, second_id));
    let report = t.engine.propagate(&mut t.session, &[])?;
    assert_eq!(recorder.events(), vec!["do:J", "undo:J"]);
    assert_eq!(report.finished.len(), 2);
    assert!(t.session.active_nodes().is_empty());
    Ok(())
}

#[test]
fn definitions_load_from_json() -> anyhow::Result<()> {
    let defs: DefFlowSet = serde_json::from_str(helpers::FLAG_FLOWS_JSON)?;
    let engine = FlowEngine::from_defs(defs)?;
    let mut t = TestSession::new(engine)?;
    assert!(t.active_labels().is_empty());

    t.answer("Q0", "anything")?;
    assert_eq!(t.active_labels(), vec!["Main/S"]);
    t.answer("Q1", "yes")?;
    assert_eq!(t.fact("F_A"), flag(true));
    Ok(())
}
