//! Command helper methods for Test.

use super::Test;
use assert_cmd::Command;
use std::process::{self, Output};

impl Test {
    /// Create a tfflow command that uses the fake tool.
    pub fn cmd(&self) -> Command {
        let mut cmd = self.bare_cmd();
        cmd.arg("--tool").arg(self.tool());
        cmd
    }

    /// Create a tfflow command isolated from the caller's environment.
    ///
    /// Returns a Command configured with:
    /// - HOME and XDG_CONFIG_HOME inside the temporary home directory
    /// - `--root` set to the test project
    /// - TFFLOW_* variables cleared and colors disabled
    pub fn bare_cmd(&self) -> Command {
        Command::from_std(self.bare_std_cmd())
    }

    /// Like `cmd`, as a plain process command for tests that need the
    /// child's pid.
    pub fn std_cmd(&self) -> process::Command {
        let mut cmd = self.bare_std_cmd();
        cmd.arg("--tool").arg(self.tool());
        cmd
    }

    fn bare_std_cmd(&self) -> process::Command {
        #[allow(deprecated)]
        let mut cmd = process::Command::new(assert_cmd::cargo::cargo_bin("tfflow"));
        cmd.env("HOME", self.home.path());
        cmd.env("XDG_CONFIG_HOME", self.home.path().join(".config"));
        cmd.env("NO_COLOR", "1");
        cmd.env("FAKE_TF_LOG", self.tool_log());
        cmd.env("FAKE_TF_ENV_LOG", self.env_log());
        for var in [
            "TFFLOW_LOG",
            "TFFLOW_TOOL",
            "TFFLOW_APP",
            "TFFLOW_CLOUD",
            "TFFLOW_ENV",
            "TFFLOW_CREDENTIALS_FILE",
            "TF_CLI_CONFIG_FILE",
            "ARM_CLIENT_ID",
            "ARM_TENANT_ID",
            "AWS_PROFILE",
            "FAKE_TF_FAIL",
            "FAKE_TF_SLEEP",
        ] {
            cmd.env_remove(var);
        }
        cmd.current_dir(self.dir.path());
        cmd.arg("--root").arg(self.dir.path());
        cmd
    }

    /// Shortcut for `tfflow <action> [args]`.
    pub fn action(&self, action: &str, args: &[&str]) -> Output {
        self.cmd()
            .arg(action)
            .args(args)
            .output()
            .expect("failed to run tfflow")
    }

    /// Shortcut for `tfflow --json <action> [args]`, parsed.
    pub fn action_json(&self, action: &str, args: &[&str]) -> (Output, serde_json::Value) {
        let output = self
            .cmd()
            .arg("--json")
            .arg(action)
            .args(args)
            .output()
            .expect("failed to run tfflow");
        let report = serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
            panic!(
                "stdout is not a JSON report ({}):\n{}\nstderr:\n{}",
                e,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            )
        });
        (output, report)
    }

    /// `tfflow destroy` with `answer` on stdin.
    pub fn destroy_answering(&self, answer: &str) -> Output {
        self.cmd()
            .arg("destroy")
            .write_stdin(answer)
            .output()
            .expect("failed to run tfflow destroy")
    }
}
