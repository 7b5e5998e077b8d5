//! Tests for `tfflow destroy`.

use predicates::prelude::*;

use crate::support::*;

#[test]
fn test_destroy_declined_changes_nothing() {
    let t = Test::project();

    t.cmd()
        .arg("destroy")
        .write_stdin("no\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("WARNING"))
        .stderr(predicate::str::contains("destroy canceled"));

    let calls = t.invocations();
    assert!(calls.iter().all(|c| !c.starts_with("destroy")), "{:?}", calls);
    assert!(calls.iter().any(|c| c.starts_with("init -backend-config=")));
}

#[test]
fn test_destroy_without_input_declines() {
    let t = Test::project();

    let (output, report) = t.action_json("destroy", &[]);
    assert_success(&output);
    assert_eq!(report["status"], "canceled");
    assert_eq!(report["state"], "canceled");
    assert_eq!(
        step_names(&report).last().map(String::as_str),
        Some("confirm")
    );
}

#[test]
fn test_destroy_confirmed_interactively() {
    let t = Test::project();

    let output = t.destroy_answering("Yes\n");
    assert_success(&output);
    assert_stderr_contains(&output, "destroy complete");

    let destroy = t
        .invocations()
        .into_iter()
        .find(|c| c.starts_with("destroy "))
        .expect("destroy was not run");
    assert!(destroy.contains("-var-file="));
    assert!(destroy.contains(SECRET_KEY));
    assert!(destroy.ends_with("-auto-approve"));
}

#[test]
fn test_destroy_yes_skips_prompt() {
    let t = Test::project();

    t.cmd()
        .args(["destroy", "--yes"])
        .assert()
        .success()
        .stderr(predicate::str::contains("WARNING").not())
        .stderr(predicate::str::contains("to confirm").not())
        .stderr(predicate::str::contains(SECRET_KEY).not())
        .stdout(predicate::str::contains(SECRET_KEY).not());

    let calls = t.invocations();
    assert!(calls.iter().all(|c| !c.starts_with("plan")));
    assert!(calls.last().unwrap().starts_with("destroy "));
}
