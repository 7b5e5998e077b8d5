//! Provisioning tool invocations.
//!
//! Builds the argument vectors for each subcommand the workflows use.

use std::path::{Path, PathBuf};

use crate::core::runner::CommandSpec;
use crate::error::{ConfigError, Result};

/// The provisioning tool binary and the composition it operates on.
#[derive(Debug, Clone)]
pub struct Tool {
    program: String,
    composition_dir: PathBuf,
}

impl Tool {
    pub fn new(program: impl Into<String>, composition_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            composition_dir: composition_dir.into(),
        }
    }

    /// Resolve `program` on `PATH` (or as a path) so a missing binary is
    /// reported before any step runs.
    pub fn locate(program: &str) -> Result<PathBuf> {
        which::which(program).map_err(|_| ConfigError::ToolNotFound(program.to_string()).into())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new(&self.program).current_dir(&self.composition_dir)
    }

    /// `init -backend=false`
    pub fn init_local(&self) -> CommandSpec {
        self.command().args(["init", "-backend=false"])
    }

    /// `init -backend-config=PATH`
    pub fn init_backend(&self, backend_config: &Path) -> CommandSpec {
        self.command()
            .arg("init")
            .arg(format!("-backend-config={}", backend_config.display()))
    }

    /// `validate`
    pub fn validate(&self) -> CommandSpec {
        self.command().arg("validate")
    }

    /// `plan -var-file=PATH [-var=KEY=VALUE]... -out=PATH`
    pub fn plan(&self, var_file: &Path, secrets: &[(String, String)], out: &Path) -> CommandSpec {
        let mut spec = self
            .command()
            .arg("plan")
            .arg(format!("-var-file={}", var_file.display()));
        for (name, value) in secrets {
            spec = spec.secret_var(name, value);
        }
        spec.arg(format!("-out={}", out.display()))
    }

    /// `show -json PATH`
    pub fn show_json(&self, plan: &Path) -> CommandSpec {
        self.command()
            .args(["show", "-json"])
            .arg(plan.display().to_string())
    }

    /// `apply -auto-approve PATH`
    pub fn apply(&self, plan: &Path) -> CommandSpec {
        self.command()
            .args(["apply", "-auto-approve"])
            .arg(plan.display().to_string())
    }

    /// `destroy -var-file=PATH [-var=KEY=VALUE]... -auto-approve`
    pub fn destroy(&self, var_file: &Path, secrets: &[(String, String)]) -> CommandSpec {
        let mut spec = self
            .command()
            .arg("destroy")
            .arg(format!("-var-file={}", var_file.display()));
        for (name, value) in secrets {
            spec = spec.secret_var(name, value);
        }
        spec.arg("-auto-approve")
    }
}
