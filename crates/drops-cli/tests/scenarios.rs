//! Scenario runner tests

use assert_matches::assert_matches;
use drops_cli::scenario::{Outcome, Scenario, ScenarioRunner};
use drops_core::{DropsConfig, ErrorKind, Notification};
use std::io::Write;

const LIFECYCLE: &str = include_str!("../scenarios/epoch_lifecycle.json");

#[test]
fn bundled_lifecycle_scenario_succeeds() {
    let scenario = Scenario::from_json(LIFECYCLE).unwrap();
    let mut runner = ScenarioRunner::new(DropsConfig::default(), &scenario).unwrap();
    let reports = runner.run(&scenario, true).unwrap();

    assert_eq!(reports.len(), scenario.steps.len());
    for report in &reports {
        assert!(report.outcome.is_ok(), "step {} failed: {:?}", report.index, report.outcome);
    }

    let advance = &reports[12];
    assert_matches!(
        advance.notifications.as_slice(),
        [Notification::EpochAdvanced { epoch: 2, .. }]
    );

    let finalized = &reports[14];
    assert_matches!(&finalized.outcome, Outcome::Ok { result } if result["status"] == "finalized");

    let verified = &reports[17];
    assert_matches!(
        verified.notifications.as_slice(),
        [Notification::ValueComputed { epoch: 1, .. }]
    );

    let summary = runner.summary();
    assert_eq!(summary["tokens"], 0);
    assert_eq!(summary["epoch"], 2);
    assert_eq!(runner.runtime().state().entropy.len(), 1);
}

#[test]
fn failing_step_is_reported_not_fatal() {
    let scenario = Scenario::from_json(
        r#"{ "steps": [
            { "op": "init", "caller": "drops" },
            { "op": "add_oracle", "caller": "mallory", "oracle": "mallory" },
            { "op": "add_oracle", "caller": "drops", "oracle": "a" }
        ] }"#,
    )
    .unwrap();
    let mut runner = ScenarioRunner::new(DropsConfig::default(), &scenario).unwrap();

    let reports = runner.run(&scenario, false).unwrap();
    assert_eq!(reports.len(), 3);
    assert_matches!(
        &reports[0].outcome,
        Outcome::Error { kind: ErrorKind::Validation, code: "no_oracles", .. }
    );
    assert_matches!(
        &reports[1].outcome,
        Outcome::Error { kind: ErrorKind::Authorization, .. }
    );
    assert!(reports[2].outcome.is_ok());
}

#[test]
fn fail_fast_stops_at_first_error() {
    let scenario = Scenario::from_json(
        r#"{ "steps": [
            { "op": "advance" },
            { "op": "add_oracle", "caller": "drops", "oracle": "a" }
        ] }"#,
    )
    .unwrap();
    let mut runner = ScenarioRunner::new(DropsConfig::default(), &scenario).unwrap();
    let reports = runner.run(&scenario, true).unwrap();
    assert_eq!(reports.len(), 1);
    assert!(runner.runtime().state().oracles.is_empty());
}

#[test]
fn unknown_operation_is_rejected() {
    assert!(Scenario::from_json(r#"{ "steps": [ { "op": "mint_everything" } ] }"#).is_err());
}

#[test]
fn scenario_loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(LIFECYCLE.as_bytes()).unwrap();
    let scenario = Scenario::load(file.path()).unwrap();
    assert_eq!(scenario.start_secs, 125);
    assert_eq!(scenario.steps.len(), 21);
}
