//! Tests for `tfflow apply`.

use predicates::prelude::*;

use crate::support::*;

#[test]
fn test_apply_plans_then_applies_fresh_plan() {
    let t = Test::project();

    let output = t.action("apply", &[]);
    assert_success(&output);
    assert_stderr_contains(&output, "apply complete");

    let calls = t.invocations();
    assert_eq!(calls.len(), 6, "calls: {:?}", calls);
    assert_eq!(calls[0], "init -backend=false");
    assert!(calls[2].starts_with("plan "));
    assert!(calls[4].starts_with("init -backend-config="));
    assert!(calls[4].ends_with("ovr-app-infra/azure/dev/backend.tf"));
    assert!(calls[5].starts_with("apply -auto-approve "));
    assert!(calls[5].ends_with("precheck.tfplan"));
}

#[test]
fn test_apply_replaces_stale_plan() {
    let t = Test::project();
    let stale = format!("{}/precheck.tfplan", COMPOSITION_DIR);
    t.write(&stale, "stale plan from yesterday");
    t.write(&format!("{}/precheck.json", COMPOSITION_DIR), "{}");

    let (output, report) = t.action_json("apply", &[]);
    assert_success(&output);

    assert_ne!(t.read(&stale), "stale plan from yesterday");
    let plan = report["steps"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["name"] == "plan")
        .unwrap();
    assert_eq!(plan["note"], "replaced plan from an earlier run");
}

#[test]
fn test_apply_without_backend_fails_before_remote_steps() {
    let t = Test::project();
    std::fs::remove_file(t.path(BACKEND_FILE)).unwrap();

    let (output, report) = t.action_json("apply", &[]);
    assert_exit_code(&output, 78);
    assert_eq!(report["failed_step"], "init-backend");
    assert!(t.invocations().iter().all(|c| !c.starts_with("apply")));
}

#[test]
fn test_apply_failure_mirrors_tool_exit_code() {
    let t = Test::project();

    t.cmd()
        .env("FAKE_TF_FAIL", "apply")
        .arg("apply")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("step apply failed"))
        .stderr(predicate::str::contains("fake failure in apply"));
}
