//! Tests for `tfflow plan`.

use crate::support::*;

#[test]
fn test_plan_runs_steps_in_order() {
    let t = Test::project();

    let output = t.action("plan", &[]);
    assert_success(&output);
    assert_stderr_contains(&output, "plan complete");

    let calls = t.invocations();
    assert_eq!(calls.len(), 4, "calls: {:?}", calls);
    assert_eq!(calls[0], "init -backend=false");
    assert_eq!(calls[1], "validate");
    assert!(calls[2].starts_with("plan -var-file="));
    assert!(calls[3].starts_with("show -json "));
}

#[test]
fn test_plan_writes_artifacts() {
    let t = Test::project();

    let output = t.action("plan", &[]);
    assert_success(&output);

    let json = t.read(&format!("{}/precheck.json", COMPOSITION_DIR));
    assert!(json.contains("format_version"));
    assert!(t.path(&format!("{}/precheck.tfplan", COMPOSITION_DIR)).is_file());

    let rc = t.read(&format!("{}/.terraformrc", COMPOSITION_DIR));
    assert!(rc.contains("filesystem_mirror"));
    assert!(rc.contains("terraform-platform/.terraform.d/plugins"));

    assert!(!t.path(&format!("{}/.tfflow.lock", COMPOSITION_DIR)).exists());
}

#[test]
fn test_plan_merges_fragments() {
    let t = Test::project();

    assert_success(&t.action("plan", &[]));

    let merged: serde_json::Value =
        serde_json::from_str(&t.read(MERGED_FILE)).expect("merged file is JSON");
    assert_eq!(merged["region"], "westus");
    assert_eq!(merged["size"], 2);
    assert_eq!(merged["tags"], serde_json::json!(["a"]));
    assert_eq!(merged["network"]["cidr"], "10.0.0.0/16");
    assert_eq!(merged["network"]["subnets"], 4);
}

#[test]
fn test_each_cloud_keeps_its_own_merged_file() {
    let t = Test::project();
    t.write("ovr-app-infra/aws/dev/vars/main.yml", "region: us-east-1\n");

    assert_success(&t.action("plan", &[]));
    assert_success(&t.action("plan", &["--cloud", "aws"]));

    let azure: serde_json::Value = serde_json::from_str(&t.read(MERGED_FILE)).unwrap();
    let aws: serde_json::Value = serde_json::from_str(
        &t.read("terraform-platform/aws/infra-stack/ovr-app-infra-dev.tfvars.json"),
    )
    .unwrap();
    assert_eq!(azure["region"], "westus");
    assert_eq!(aws["region"], "us-east-1");

    let aws_plan = &t.invocations()[6];
    assert!(
        aws_plan.contains("terraform-platform/aws/infra-stack/ovr-app-infra-dev.tfvars.json"),
        "{}",
        aws_plan
    );
}

#[test]
fn test_sensitive_value_is_redacted_and_masked() {
    let t = Test::project();

    let output = t.action("plan", &[]);
    assert_success(&output);
    assert_never_printed(&output, SECRET_KEY);
    assert_stderr_contains(&output, "-var=admin_public_key=***");

    let merged = t.read(MERGED_FILE);
    assert!(!merged.contains("admin_public_key"));

    // The tool itself still receives the real value.
    let plan_call = &t.invocations()[2];
    assert!(plan_call.contains(SECRET_KEY));
}

#[test]
fn test_plan_json_report() {
    let t = Test::project();

    let (output, report) = t.action_json("plan", &[]);
    assert_success(&output);

    assert_eq!(report["status"], "succeeded");
    assert_eq!(report["state"], "done");
    assert_eq!(report["exit_code"], 0);
    assert_eq!(
        step_names(&report),
        [
            "load-credentials",
            "merge-variables",
            "configure-mirror",
            "init",
            "validate",
            "plan",
            "show"
        ]
    );
    assert_eq!(report["plan"]["sha256"].as_str().map(str::len), Some(64));
    assert_never_printed(&output, SECRET_KEY);
}

#[test]
fn test_plan_for_other_target() {
    let t = Test::new();
    t.write("shop/aws/prod/vars/main.yaml", "region: us-east-1\n");
    std::fs::create_dir_all(t.path("terraform-platform/aws/infra-stack")).unwrap();

    let output = t.action("plan", &["--app", "shop", "--cloud", "aws", "--env", "prod"]);
    assert_success(&output);
    assert!(t
        .path("terraform-platform/aws/infra-stack/precheck.tfplan")
        .is_file());
}

#[test]
fn test_target_from_environment() {
    let t = Test::new();
    t.write("shop/gcp/qa/vars/main.yml", "project: shop-qa\n");

    let output = t
        .cmd()
        .env("TFFLOW_APP", "shop")
        .env("TFFLOW_CLOUD", "gcp")
        .env("TFFLOW_ENV", "qa")
        .arg("plan")
        .output()
        .unwrap();
    assert_success(&output);
    assert_stderr_contains(&output, "shop/gcp/qa");
}

#[test]
fn test_credentials_file_fills_unset_values_only() {
    let t = Test::project();
    t.write(
        "creds.env",
        "# test credentials\nexport ARM_CLIENT_ID=from-file\nARM_TENANT_ID=\"tenant\"\n",
    );
    t.write(
        ".tfflow.toml",
        "[credentials.defaults]\nAWS_PROFILE = \"dev-iac\"\n",
    );

    let output = t
        .cmd()
        .env("ARM_CLIENT_ID", "from-env")
        .arg("--credentials")
        .arg(t.path("creds.env"))
        .arg("plan")
        .output()
        .unwrap();
    assert_success(&output);

    let env = t.tool_env();
    assert!(!env.is_empty());
    for line in &env {
        assert!(line.contains("ARM_CLIENT_ID=from-env "), "{}", line);
        assert!(line.contains("ARM_TENANT_ID=tenant "), "{}", line);
        assert!(line.contains("AWS_PROFILE=dev-iac "), "{}", line);
        assert!(line.contains(".terraformrc"), "{}", line);
    }
}

#[test]
fn test_missing_credentials_file_warns_and_continues() {
    let t = Test::project();

    let output = t
        .cmd()
        .arg("--credentials")
        .arg(t.path("nope.env"))
        .arg("plan")
        .output()
        .unwrap();
    assert_success(&output);
    assert_stderr_contains(&output, "credential file not found");
}
