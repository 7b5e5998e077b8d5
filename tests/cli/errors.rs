//! Tests for error handling and CLI flags.

use std::process::Stdio;
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use predicates::prelude::*;

use crate::support::*;

#[test]
fn test_help_lists_actions() {
    let t = Test::new();

    let output = t.cmd().arg("--help").output().unwrap();
    assert_success(&output);
    let out = stdout(&output);
    for action in ["plan", "apply", "destroy", "completions"] {
        assert!(out.contains(action), "help missing {}", action);
    }
}

#[test]
fn test_unknown_command_fails() {
    let t = Test::new();

    let output = t.cmd().arg("unknown-command").output().unwrap();
    assert_failure(&output);
}

#[test]
fn test_missing_vars_dir_is_config_error() {
    let t = Test::new();

    let output = t.action("plan", &[]);
    assert_exit_code(&output, 78);
    assert_stderr_contains(&output, "variable directory not found");
    assert_stderr_contains(&output, "--app/--cloud/--env");
    assert!(t.invocations().is_empty());
}

#[test]
fn test_empty_vars_dir_is_config_error() {
    let t = Test::new();
    t.write(&format!("{}/README.md", VARS_DIR), "not a fragment\n");

    let output = t.action("plan", &[]);
    assert_exit_code(&output, 78);
    assert_stderr_contains(&output, "no variable fragments");
}

#[test]
fn test_malformed_fragment_names_file() {
    let t = Test::project();
    t.write(&format!("{}/30-broken.yaml", VARS_DIR), "region: [unclosed\n");

    let output = t.action("plan", &[]);
    assert_exit_code(&output, 78);
    assert_stderr_contains(&output, "30-broken.yaml");
}

#[test]
fn test_validate_failure_halts_run() {
    let t = Test::project();

    let (output, report) = t
        .cmd()
        .env("FAKE_TF_FAIL", "validate")
        .args(["--json", "plan"])
        .output()
        .map(|o| {
            let report: serde_json::Value = serde_json::from_slice(&o.stdout).unwrap();
            (o, report)
        })
        .unwrap();

    assert_exit_code(&output, 3);
    assert_eq!(report["status"], "failed");
    assert_eq!(report["failed_step"], "validate");
    assert_eq!(
        step_names(&report),
        [
            "load-credentials",
            "merge-variables",
            "configure-mirror",
            "init",
            "validate"
        ]
    );
    assert_eq!(t.invocations().len(), 2);
}

#[test]
fn test_held_lock_fails_fast() {
    let t = Test::project();
    t.write(
        &format!("{}/.tfflow.lock", COMPOSITION_DIR),
        r#"{"holder":"ci@runner","pid":42,"acquired_at":"2026-01-01T00:00:00Z"}"#,
    );

    let output = t.action("plan", &[]);
    assert_exit_code(&output, 75);
    assert_stderr_contains(&output, "ci@runner");
    assert!(t.invocations().is_empty());
    assert!(t.path(&format!("{}/.tfflow.lock", COMPOSITION_DIR)).exists());
}

#[test]
fn test_held_lock_names_holder() {
    let t = Test::project();
    t.write(
        LOCK_FILE,
        r#"{"holder":"ci@runner","pid":42,"acquired_at":"2026-01-01T00:00:00Z"}"#,
    );

    t.cmd()
        .arg("plan")
        .assert()
        .code(75)
        .stderr(predicate::str::contains("ci@runner").and(predicate::str::contains("pid 42")));
}

#[test]
fn test_interrupted_run_does_not_block_the_next() {
    let t = Test::project();

    let mut child = t
        .std_cmd()
        .env("FAKE_TF_SLEEP", "5")
        .arg("plan")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn tfflow");

    let deadline = Instant::now() + Duration::from_secs(10);
    while t.invocations().is_empty() {
        assert!(Instant::now() < deadline, "run never reached init");
        thread::sleep(Duration::from_millis(20));
    }
    signal::kill(Pid::from_raw(child.id() as i32), Signal::SIGINT).unwrap();
    let status = child.wait().unwrap();
    assert!(!status.success());
    assert!(t.path(LOCK_FILE).exists());

    t.cmd()
        .arg("plan")
        .assert()
        .success()
        .stderr(predicate::str::contains("stale run lock"))
        .stderr(predicate::str::contains("plan complete"));
    assert!(!t.path(LOCK_FILE).exists());
}

#[test]
fn test_missing_tool_reported() {
    let t = Test::project();

    t.bare_cmd()
        .args(["--tool", "definitely-not-a-real-tool", "plan"])
        .assert()
        .code(78)
        .stderr(predicate::str::contains("provisioning tool not found"));
}

#[test]
fn test_unknown_settings_field_rejected() {
    let t = Test::project();
    t.write(".tfflow.toml", "[tfflow]\ntool = \"terraform\"\ncolour = true\n");

    let output = t.action("plan", &[]);
    assert_exit_code(&output, 78);
    assert_stderr_contains(&output, "settings");
}

#[test]
fn test_invalid_target_rejected() {
    let t = Test::project();

    let output = t.action("plan", &["--env", "../prod"]);
    assert_exit_code(&output, 78);
    assert_stderr_contains(&output, "env");
}

#[test]
fn test_tool_from_environment() {
    let t = Test::project();

    let output = t
        .bare_cmd()
        .env("TFFLOW_TOOL", t.tool())
        .arg("plan")
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(t.invocations().len(), 4);
}

#[test]
fn test_completions_generated() {
    let t = Test::new();

    t.cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tfflow"));
}
