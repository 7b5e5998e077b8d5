//! Plan, apply, and destroy commands.

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::cli::{output, Globals, TargetArgs};
use crate::core::confirm::Confirmation;
use crate::core::constants;
use crate::core::credentials;
use crate::core::environment::Environment;
use crate::core::merge::MergeOptions;
use crate::core::runner::{CommandSpec, OutputMode, ProcessRunner};
use crate::core::settings::Settings;
use crate::core::target::{Layout, Target};
use crate::core::tool::Tool;
use crate::core::workflow::{
    Action, Outcome, Progress, RunConfig, StepRecord, StepStatus, Workflow, WorkflowEngine,
    WorkflowReport, WorkflowStep,
};
use crate::error::{Error, Result};

/// Run `action` for the target described by `args` and return the exit code.
pub fn execute(action: Action, globals: &Globals, args: &TargetArgs) -> Result<i32> {
    let env = Environment::from_process();
    let Prepared { config, timeout } = prepare(globals, args, &env)?;
    Tool::locate(&config.tool)?;

    let runner = ProcessRunner::new()
        .with_timeout(timeout)
        .quiet(globals.json);
    let renderer = Renderer { quiet: globals.json };

    if !globals.json {
        output::header(&format!("tfflow {}", action));
        output::kv("target", &config.target);
        output::kv("composition", output::path(config.layout.composition_dir.display()));
        output::rule();
    }

    let report = WorkflowEngine::new(config, &runner)
        .confirmation(Confirmation::from_flag(args.yes))
        .progress(&renderer)
        .run(action, env)?;

    if globals.json {
        let json = serde_json::to_string_pretty(&report.summary())
            .map_err(|e| Error::Internal(format!("failed to serialize report: {}", e)))?;
        println!("{}", json);
    } else {
        summarize(&report);
    }

    Ok(report.exit_code())
}

/// A run configuration plus the runner settings that go with it.
#[derive(Debug)]
pub struct Prepared {
    pub config: RunConfig,
    pub timeout: Option<Duration>,
}

/// Resolve settings, target, and layout into a run configuration.
pub fn prepare(globals: &Globals, args: &TargetArgs, env: &Environment) -> Result<Prepared> {
    let root = if globals.root.is_absolute() {
        globals.root.clone()
    } else {
        std::env::current_dir()?.join(&globals.root)
    };
    let settings = Settings::load(&root)?;

    let pick = |flag: &Option<String>, configured: &Option<String>, default: &str| {
        flag.clone()
            .or_else(|| configured.clone())
            .unwrap_or_else(|| default.to_string())
    };
    let target = Target::new(
        &pick(&args.app, &settings.target.app, constants::DEFAULT_APP),
        &pick(&args.cloud, &settings.target.cloud, constants::DEFAULT_CLOUD),
        &pick(&args.env, &settings.target.env, constants::DEFAULT_ENV),
    )?;
    let layout = Layout::resolve(&root, &target, &settings.layout);

    let explicit: Option<PathBuf> = globals
        .credentials
        .clone()
        .or_else(|| settings.credentials_file());
    let credentials_file = credentials::resolve_path(explicit.as_deref(), env, &target.cloud);
    debug!(?credentials_file, "resolved credential file");

    let timeout = globals
        .timeout
        .map(Duration::from_secs)
        .or_else(|| settings.timeout());
    let config = RunConfig {
        target,
        layout,
        tool: globals
            .tool
            .clone()
            .unwrap_or_else(|| settings.tfflow.tool.clone()),
        variables: MergeOptions {
            sensitive: settings.variables.sensitive.clone(),
            redact: settings.variables.redact,
        },
        credentials_file,
        credential_defaults: settings.credentials.defaults.clone(),
    };

    Ok(Prepared { config, timeout })
}

/// Renders engine progress on the terminal.
struct Renderer {
    quiet: bool,
}

impl Progress for Renderer {
    fn step_started(&self, index: usize, total: usize, step: &WorkflowStep) {
        if !self.quiet {
            output::step(index, total, step.kind.title());
        }
    }

    fn command(&self, spec: &CommandSpec) {
        if !self.quiet {
            output::command(&spec.display_line());
        }
    }

    fn step_finished(&self, record: &StepRecord) {
        if self.quiet {
            return;
        }
        let ok = match record.status {
            StepStatus::Succeeded => Some(true),
            StepStatus::Failed => Some(false),
            StepStatus::Canceled => None,
        };
        output::step_result(ok, record.name, record.duration, record.note.as_deref());
    }

    fn confirm_required(&self, target: &Target) {
        output::danger(&[
            "WARNING: this destroys every resource of".to_string(),
            format!("  app {}  cloud {}  env {}", target.app, target.cloud, target.env),
            "This cannot be undone.".to_string(),
        ]);
    }
}

fn summarize(report: &WorkflowReport) {
    output::rule();
    match &report.outcome {
        Outcome::Succeeded => {
            let msg = match report.action {
                Action::Plan => "plan complete",
                Action::Apply => "apply complete",
                Action::Destroy => "destroy complete",
            };
            output::success(msg);
            if let Some(plan) = &report.plan {
                output::kv("plan", output::path(plan.plan.display()));
                output::kv("plan json", output::path(plan.json.display()));
            }
        }
        Outcome::CanceledByUser => {
            output::warn("destroy canceled, nothing was changed");
        }
        Outcome::FailedAtStep { step, error } => {
            output::error(&format!("step {} failed: {}", step, error));
            if let Some((stdout, stderr)) = error.captured_output() {
                if !was_streamed(report.action, step) {
                    output::captured("stdout", stdout);
                    output::captured("stderr", stderr);
                }
            }
            if let Some(hint) = crate::cli::hint(error) {
                output::hint(hint);
            }
        }
    }
}

/// Whether the tool output for `step` already reached the terminal.
fn was_streamed(action: Action, step: &str) -> bool {
    Workflow::for_action(action)
        .steps
        .iter()
        .find(|s| s.name == step)
        .is_some_and(|s| s.kind.output_mode() == OutputMode::Streamed)
}
