//! Command-line interface.

pub mod completions;
pub mod output;
pub mod workflow;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::core::workflow::Action;
use crate::error::{ConfigError, Error, LockError, Result};

/// tfflow - Ordered plan, apply, and destroy runs for Terraform-compatible tools.
#[derive(Parser, Debug)]
#[command(
    name = "tfflow",
    about = "Ordered, lock-guarded plan/apply/destroy workflows for Terraform-compatible tools",
    version,
    after_help = "Set TFFLOW_LOG to control log output (e.g. TFFLOW_LOG=tfflow=debug)."
)]
pub struct Cli {
    /// Project root containing the variable tree and composition
    #[arg(long, global = true, default_value = ".", value_name = "DIR")]
    pub root: PathBuf,

    /// Provisioning tool binary (overrides .tfflow.toml)
    #[arg(long, global = true, env = "TFFLOW_TOOL", value_name = "PATH")]
    pub tool: Option<String>,

    /// Per-command timeout in seconds (overrides .tfflow.toml)
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Credential file to load before running
    #[arg(long, global = true, env = "TFFLOW_CREDENTIALS_FILE", value_name = "FILE")]
    pub credentials: Option<PathBuf>,

    /// Print the run report as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Merge variables, initialize, validate, and write a plan
    Plan(TargetArgs),

    /// Plan, then apply that plan against the remote backend
    Apply(TargetArgs),

    /// Destroy every resource of the target after confirmation
    Destroy(TargetArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Which deployment unit to operate on.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Application name
    #[arg(long, env = "TFFLOW_APP")]
    pub app: Option<String>,

    /// Cloud provider
    #[arg(long, env = "TFFLOW_CLOUD")]
    pub cloud: Option<String>,

    /// Environment name
    #[arg(long, env = "TFFLOW_ENV")]
    pub env: Option<String>,

    /// Skip the destroy confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Global options shared by every workflow command.
#[derive(Debug, Clone)]
pub struct Globals {
    pub root: PathBuf,
    pub tool: Option<String>,
    pub timeout: Option<u64>,
    pub credentials: Option<PathBuf>,
    pub json: bool,
}

/// Execute a command and return the process exit code.
pub fn execute(cli: Cli) -> Result<i32> {
    let globals = Globals {
        root: cli.root,
        tool: cli.tool,
        timeout: cli.timeout,
        credentials: cli.credentials,
        json: cli.json,
    };

    match cli.command {
        Command::Plan(target) => workflow::execute(Action::Plan, &globals, &target),
        Command::Apply(target) => workflow::execute(Action::Apply, &globals, &target),
        Command::Destroy(target) => workflow::execute(Action::Destroy, &globals, &target),
        Command::Completions { shell } => completions::execute(shell).map(|()| 0),
    }
}

/// Suggested next step for an error, if there is an obvious one.
pub fn hint(error: &Error) -> Option<&'static str> {
    match error {
        Error::Config(ConfigError::MissingDir(_)) | Error::Config(ConfigError::EmptyDir(_)) => {
            Some("check --app/--cloud/--env or [layout] vars_dir in .tfflow.toml")
        }
        Error::Config(ConfigError::ToolNotFound(_)) => {
            Some("install the tool or pass --tool with its path")
        }
        Error::Config(ConfigError::MissingBackend(_)) => {
            Some("create the backend configuration or set [layout] backend_config")
        }
        Error::Config(ConfigError::Settings(_)) => Some("fix .tfflow.toml and retry"),
        Error::Lock(LockError::Held { .. }) => {
            Some("wait for the other run to finish, or delete the lock file if it is stale")
        }
        _ => None,
    }
}
