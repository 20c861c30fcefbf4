mod helpers;

use diaflow_engine::{EngineError, SupportKind};
use diaflow_testkit::TestSession;
use helpers::{recording_engine, subflow_defs};

#[test]
fn composed_node_runs_and_retracts_its_subflow() -> anyhow::Result<()> {
    let (engine, recorder) = recording_engine(subflow_defs(), vec![])?;
    let mut t = TestSession::new(engine)?;
    t.start("Main", "S")?;
    assert_eq!(t.path_names(), vec![vec!["S"]]);

    let report = t.answer("Q", "go")?;
    assert!(report.changed);
    assert_eq!(
        t.path_names(),
        vec![vec!["S", "C"], vec!["Begin", "X", "End"]]
    );
    assert_eq!(t.snapshot_labels(), vec!["Sub/End"]);
    assert_eq!(recorder.events(), vec!["do:X"]);
    assert!(!t.is_active("Sub", "After"));

    let report = t.answer("Q", "stop")?;
    assert_eq!(report.finished.len(), 1);
    assert_eq!(t.path_names(), vec![vec!["S"]]);
    assert_eq!(recorder.events(), vec!["do:X", "undo:X"]);
    assert!(t.snapshot_labels().is_empty());
    assert_eq!(t.active_labels(), vec!["Main/S"]);
    Ok(())
}

#[test]
fn reentering_a_subflow_reuses_the_called_flow() -> anyhow::Result<()> {
    let (engine, recorder) = recording_engine(subflow_defs(), vec![])?;
    let mut t = TestSession::new(engine)?;
    t.start("Main", "S")?;
    t.answer("Q", "go")?;
    t.answer("Q", "stop")?;
    t.answer("Q", "go")?;
    assert_eq!(
        t.path_names(),
        vec![vec!["S", "C"], vec!["Begin", "X", "End"]]
    );
    assert_eq!(recorder.events(), vec!["do:X", "undo:X", "do:X"]);
    Ok(())
}

#[test]
fn enter_subflow_always_opens_a_path() -> anyhow::Result<()> {
    let (engine, recorder) = recording_engine(subflow_defs(), vec![])?;
    let mut t = TestSession::new(engine)?;
    let c = t.node("Main", "C")?;
    let begin = t.node("Sub", "Begin")?;

    let first = t.session.new_support(SupportKind::Valid);
    let second = t.session.new_support(SupportKind::Valid);
    let a = t.engine.enter_subflow(&mut t.session, c, begin, first)?;
    let b = t.engine.enter_subflow(&mut t.session, c, begin, second)?;
    assert_ne!(a, b);
    assert_eq!(t.session.paths().count(), 2);

    t.engine.propagate(&mut t.session, &[])?;
    // The second strand stops at X, which already holds support for that edge.
    assert_eq!(
        t.path_names(),
        vec![vec!["Begin", "X", "End"], vec!["Begin"]]
    );
    assert_eq!(recorder.events(), vec!["do:X"]);
    Ok(())
}

#[test]
fn enter_subflow_requires_a_composed_caller() -> anyhow::Result<()> {
    let (engine, _recorder) = recording_engine(subflow_defs(), vec![])?;
    let mut t = TestSession::new(engine)?;
    let s = t.node("Main", "S")?;
    let begin = t.node("Sub", "Begin")?;
    let x = t.node("Sub", "X")?;
    let c = t.node("Main", "C")?;

    let support = t.session.new_support(SupportKind::Valid);
    let err = t
        .engine
        .enter_subflow(&mut t.session, s, begin, support.clone())
        .unwrap_err();
    assert!(matches!(err, EngineError::NotComposed(label) if label == "Main/S"));

    let err = t
        .engine
        .enter_subflow(&mut t.session, c, x, support)
        .unwrap_err();
    assert!(matches!(err, EngineError::NotAnOrigin(label) if label == "Sub/X"));
    assert_eq!(t.session.paths().count(), 0);
    Ok(())
}

#[test]
fn reachability_spans_called_flows() -> anyhow::Result<()> {
    let (engine, _recorder) = recording_engine(subflow_defs(), vec![])?;
    let t = TestSession::new(engine)?;
    let flows = t.engine.flows();
    let s = t.node("Main", "S")?;
    let labels: Vec<_> = flows
        .reachable_nodes(s)
        .into_iter()
        .map(|node| flows.label(node))
        .collect();
    assert_eq!(
        labels,
        vec!["Main/S", "Main/C", "Sub/Begin", "Sub/X", "Sub/End", "Sub/After"]
    );
    Ok(())
}
