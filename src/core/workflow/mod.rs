//! The workflow engine.
//!
//! Runs an action's steps strictly in order under the composition lock. The
//! first failure ends the run; nothing is retried.

mod definition;
mod report;
mod state;

pub use definition::{Action, Effect, StepKind, Workflow, WorkflowStep};
pub use report::{Outcome, ReportSummary, StepRecord, StepStatus, WorkflowReport};
pub use state::State;

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::core::confirm::Confirmation;
use crate::core::constants;
use crate::core::credentials;
use crate::core::environment::Environment;
use crate::core::lock::RunLock;
use crate::core::merge::{self, MergeOptions};
use crate::core::mirror;
use crate::core::plan::{self, PlanArtifact};
use crate::core::runner::{ensure_success, CommandOutput, CommandRunner, CommandSpec};
use crate::core::target::{Layout, Target};
use crate::core::tool::Tool;
use crate::core::variables::VariableDocument;
use crate::error::{ConfigError, Error, Result};

/// Observer for run progress. All methods default to no-ops.
pub trait Progress {
    fn step_started(&self, _index: usize, _total: usize, _step: &WorkflowStep) {}
    fn command(&self, _spec: &CommandSpec) {}
    fn step_finished(&self, _record: &StepRecord) {}
    /// Called right before the operator is asked to approve a destroy.
    fn confirm_required(&self, _target: &Target) {}
}

/// A [`Progress`] that reports nothing.
#[derive(Debug, Default)]
pub struct Silent;

impl Progress for Silent {}

/// Everything a run needs to know up front.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub target: Target,
    pub layout: Layout,
    /// Provisioning tool binary.
    pub tool: String,
    pub variables: MergeOptions,
    pub credentials_file: Option<PathBuf>,
    pub credential_defaults: BTreeMap<String, String>,
}

/// Orchestrates plan, apply, and destroy runs.
pub struct WorkflowEngine<'a> {
    config: RunConfig,
    runner: &'a dyn CommandRunner,
    confirmation: Confirmation,
    progress: &'a dyn Progress,
}

/// Values produced by earlier steps of the current run.
struct RunContext {
    env: Environment,
    document: Option<VariableDocument>,
    var_file: Option<PathBuf>,
    plan: Option<PlanArtifact>,
}

/// What a successful step leaves for its record.
#[derive(Default)]
struct StepDone {
    command: Option<String>,
    output: Option<CommandOutput>,
    note: Option<String>,
}

impl<'a> WorkflowEngine<'a> {
    /// Create an engine that declines destroy confirmations and reports
    /// nothing until configured otherwise.
    pub fn new(config: RunConfig, runner: &'a dyn CommandRunner) -> Self {
        Self {
            config,
            runner,
            confirmation: Confirmation::Denied,
            progress: &Silent,
        }
    }

    pub fn confirmation(mut self, confirmation: Confirmation) -> Self {
        self.confirmation = confirmation;
        self
    }

    pub fn progress(mut self, progress: &'a dyn Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run `action` with `env` as the base environment.
    ///
    /// Step failures and cancellation are reported through the returned
    /// report's outcome.
    ///
    /// # Errors
    ///
    /// Returns `LockError::Held` without running any step if another run
    /// holds the composition directory.
    pub fn run(&self, action: Action, env: Environment) -> Result<WorkflowReport> {
        let workflow = Workflow::for_action(action);
        let lock = RunLock::acquire(&self.config.layout.lock_file())?;

        info!(%action, target = %self.config.target, "starting workflow");
        let report = self.execute(&workflow, env);
        info!(%action, state = ?report.state, "workflow finished");

        lock.release()?;
        Ok(report)
    }

    fn execute(&self, workflow: &Workflow, env: Environment) -> WorkflowReport {
        let tool = Tool::new(&self.config.tool, &self.config.layout.composition_dir);
        let mut ctx = RunContext {
            env,
            document: None,
            var_file: None,
            plan: None,
        };
        let mut state = State::Init;
        let mut records: Vec<StepRecord> = Vec::with_capacity(workflow.steps.len());
        let mut succeeded: HashSet<&'static str> = HashSet::new();
        let total = workflow.steps.len();

        for (index, step) in workflow.steps.iter().enumerate() {
            self.progress.step_started(index, total, step);
            let started = Instant::now();

            let result = check_preconditions(step, &records, &succeeded)
                .and_then(|()| self.perform(step, &tool, &mut ctx))
                .and_then(|done| {
                    if let Some(next) = step.kind.reaches() {
                        state = state.advance(next)?;
                    }
                    Ok(done)
                });

            let (status, done, outcome) = match result {
                Ok(done) => (StepStatus::Succeeded, done, None),
                Err(Error::UserCanceled) => {
                    info!(step = step.name, "workflow canceled by operator");
                    let done = StepDone {
                        note: Some("declined by operator".to_string()),
                        ..StepDone::default()
                    };
                    (StepStatus::Canceled, done, Some(Outcome::CanceledByUser))
                }
                Err(error) => {
                    warn!(step = step.name, error = %error, "step failed");
                    let done = failure_details(&error);
                    let outcome = Outcome::FailedAtStep {
                        step: step.name,
                        error,
                    };
                    (StepStatus::Failed, done, Some(outcome))
                }
            };

            let record = StepRecord {
                name: step.name,
                effect: step.effect,
                status,
                command: done.command,
                exit_code: done.output.as_ref().and_then(|o| o.exit_code),
                output: done.output,
                note: done.note,
                duration: started.elapsed(),
            };
            self.progress.step_finished(&record);
            records.push(record);

            match outcome {
                None => {
                    succeeded.insert(step.name);
                }
                Some(outcome) => {
                    let terminal = match outcome {
                        Outcome::CanceledByUser => State::Canceled,
                        _ => State::Failed,
                    };
                    let state = state.advance(terminal).unwrap_or(terminal);
                    return self.report(workflow, state, records, outcome, ctx);
                }
            }
        }

        match state.advance(State::Done) {
            Ok(done) => self.report(workflow, done, records, Outcome::Succeeded, ctx),
            Err(error) => {
                let step = workflow.steps.last().map(|s| s.name).unwrap_or("init");
                let outcome = Outcome::FailedAtStep { step, error };
                self.report(workflow, State::Failed, records, outcome, ctx)
            }
        }
    }

    fn report(
        &self,
        workflow: &Workflow,
        state: State,
        steps: Vec<StepRecord>,
        outcome: Outcome,
        ctx: RunContext,
    ) -> WorkflowReport {
        WorkflowReport {
            action: workflow.action,
            target: self.config.target.clone(),
            state,
            steps,
            outcome,
            plan: ctx.plan,
            merged_output: ctx.var_file,
        }
    }

    fn perform(&self, step: &WorkflowStep, tool: &Tool, ctx: &mut RunContext) -> Result<StepDone> {
        let layout = &self.config.layout;
        debug!(step = step.name, "performing step");

        match step.kind {
            StepKind::LoadCredentials => {
                let source = credentials::load(
                    &mut ctx.env,
                    self.config.credentials_file.as_deref(),
                    &self.config.credential_defaults,
                )?;
                let note = source.warning().or_else(|| match &source {
                    credentials::CredentialSource::File { path, applied, .. } => Some(format!(
                        "{} value(s) from {}",
                        applied.len(),
                        path.display()
                    )),
                    credentials::CredentialSource::Ambient { .. } => None,
                });
                Ok(StepDone {
                    note,
                    ..StepDone::default()
                })
            }
            StepKind::MergeVariables => {
                let merged = merge::merge_to_file(
                    &layout.vars_dir,
                    &layout.merged_output,
                    &self.config.variables,
                )?;
                let note = format!(
                    "{} variable(s), {} sensitive -> {}",
                    merged.document.values().len(),
                    merged.document.sensitive().len(),
                    merged.path.display()
                );
                ctx.document = Some(merged.document);
                ctx.var_file = Some(merged.path);
                Ok(StepDone {
                    note: Some(note),
                    ..StepDone::default()
                })
            }
            StepKind::ConfigureMirror => {
                let config_path = layout.mirror_config();
                mirror::configure(&config_path, &layout.plugin_cache)?;
                ctx.env
                    .set(constants::CLI_CONFIG_ENV, &config_path.to_string_lossy());
                Ok(StepDone {
                    note: Some(format!("mirror {}", layout.plugin_cache.display())),
                    ..StepDone::default()
                })
            }
            StepKind::InitLocal => self.invoke(step, tool.init_local(), ctx),
            StepKind::Validate => self.invoke(step, tool.validate(), ctx),
            StepKind::Plan => {
                let plan_file = layout.plan_file();
                let plan_json = layout.plan_json();
                let removed = plan::clear_stale(&[&plan_file, &plan_json])?;
                if removed > 0 {
                    info!(removed, "removed plan artifacts from an earlier run");
                }

                let (var_file, secrets) = variables(ctx)?;
                let spec = tool.plan(&var_file, &secrets, &plan_file);
                let mut done = self.invoke(step, spec, ctx)?;

                ctx.plan = Some(PlanArtifact::capture(&plan_file, &plan_json)?);
                if removed > 0 {
                    done.note = Some("replaced plan from an earlier run".to_string());
                }
                Ok(done)
            }
            StepKind::RenderPlan => {
                let artifact = current_plan(ctx)?.clone();
                let mut done = self.invoke(step, tool.show_json(&artifact.plan), ctx)?;
                let rendered = done
                    .output
                    .as_ref()
                    .map(|o| o.stdout.as_str())
                    .unwrap_or_default();
                fs::write(&artifact.json, rendered)?;
                done.note = Some(format!("wrote {}", artifact.json.display()));
                Ok(done)
            }
            StepKind::InitBackend => {
                if !layout.backend_config.is_file() {
                    return Err(ConfigError::MissingBackend(layout.backend_config.clone()).into());
                }
                self.invoke(step, tool.init_backend(&layout.backend_config), ctx)
            }
            StepKind::Confirm => {
                if self.confirmation.prompts() {
                    self.progress.confirm_required(&self.config.target);
                }
                let prompt = "Type 'yes' or 'y' to confirm";
                if self.confirmation.confirm(prompt)? {
                    let note = match self.confirmation {
                        Confirmation::PreApproved => "pre-approved",
                        _ => "confirmed by operator",
                    };
                    Ok(StepDone {
                        note: Some(note.to_string()),
                        ..StepDone::default()
                    })
                } else {
                    Err(Error::UserCanceled)
                }
            }
            StepKind::Apply => {
                let artifact = current_plan(ctx)?;
                artifact.verify()?;
                let spec = tool.apply(&artifact.plan);
                self.invoke(step, spec, ctx)
            }
            StepKind::Destroy => {
                let (var_file, secrets) = variables(ctx)?;
                self.invoke(step, tool.destroy(&var_file, &secrets), ctx)
            }
        }
    }

    /// Run a tool command for `step`, failing on a non-zero exit.
    fn invoke(&self, step: &WorkflowStep, spec: CommandSpec, ctx: &RunContext) -> Result<StepDone> {
        let spec = spec.envs(ctx.env.overlay());
        self.progress.command(&spec);
        info!(step = step.name, command = %spec, "running tool");

        let output = self.runner.run(&spec, step.kind.output_mode())?;
        let output = ensure_success(&spec, output)?;
        Ok(StepDone {
            command: Some(spec.display_line()),
            output: Some(output),
            note: None,
        })
    }
}

fn check_preconditions(
    step: &WorkflowStep,
    records: &[StepRecord],
    succeeded: &HashSet<&'static str>,
) -> Result<()> {
    if let Some(missing) = step.requires.iter().find(|name| !succeeded.contains(*name)) {
        return Err(Error::Internal(format!(
            "step {} requires {} to have succeeded",
            step.name, missing
        )));
    }

    if step.effect == Effect::MutatesRemote
        && records.iter().any(|r| r.status != StepStatus::Succeeded)
    {
        return Err(Error::Internal(format!(
            "refusing to run {}: an earlier step did not succeed",
            step.name
        )));
    }

    Ok(())
}

fn variables(ctx: &RunContext) -> Result<(PathBuf, Vec<(String, String)>)> {
    match (&ctx.var_file, &ctx.document) {
        (Some(file), Some(document)) => Ok((file.clone(), document.sensitive_args())),
        _ => Err(Error::Internal(
            "variables have not been merged in this run".to_string(),
        )),
    }
}

fn current_plan(ctx: &RunContext) -> Result<&PlanArtifact> {
    ctx.plan
        .as_ref()
        .ok_or_else(|| Error::Internal("no plan artifact was produced in this run".to_string()))
}

fn failure_details(error: &Error) -> StepDone {
    use crate::error::StepError;

    match error {
        Error::Step(StepError::Failed {
            command,
            exit_code,
            stdout,
            stderr,
        }) => StepDone {
            command: Some(command.clone()),
            output: Some(CommandOutput {
                exit_code: *exit_code,
                stdout: stdout.clone(),
                stderr: stderr.clone(),
            }),
            note: None,
        },
        Error::Step(StepError::TimedOut {
            command,
            stdout,
            stderr,
            ..
        }) => StepDone {
            command: Some(command.clone()),
            output: Some(CommandOutput {
                exit_code: None,
                stdout: stdout.clone(),
                stderr: stderr.clone(),
            }),
            note: Some("timed out".to_string()),
        },
        _ => StepDone::default(),
    }
}
