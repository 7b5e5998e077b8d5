//! Workflow definitions.
//!
//! Each action is a fixed, ordered list of steps. A step names the steps that
//! must have succeeded before it may run.

use std::fmt;

use serde::Serialize;

use super::state::State;
use crate::core::runner::OutputMode;

/// A top-level workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Plan,
    Apply,
    Destroy,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Plan => "plan",
            Action::Apply => "apply",
            Action::Destroy => "destroy",
        })
    }
}

/// What a step may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Effect {
    ReadOnly,
    MutatesLocal,
    MutatesRemote,
}

/// The unit of work a step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    LoadCredentials,
    MergeVariables,
    ConfigureMirror,
    InitLocal,
    Validate,
    Plan,
    RenderPlan,
    InitBackend,
    Confirm,
    Apply,
    Destroy,
}

impl StepKind {
    pub fn name(self) -> &'static str {
        match self {
            StepKind::LoadCredentials => "load-credentials",
            StepKind::MergeVariables => "merge-variables",
            StepKind::ConfigureMirror => "configure-mirror",
            StepKind::InitLocal => "init",
            StepKind::Validate => "validate",
            StepKind::Plan => "plan",
            StepKind::RenderPlan => "show",
            StepKind::InitBackend => "init-backend",
            StepKind::Confirm => "confirm",
            StepKind::Apply => "apply",
            StepKind::Destroy => "destroy",
        }
    }

    /// Human-readable description for progress output.
    pub fn title(self) -> &'static str {
        match self {
            StepKind::LoadCredentials => "Load credentials",
            StepKind::MergeVariables => "Merge variable fragments",
            StepKind::ConfigureMirror => "Configure provider mirror",
            StepKind::InitLocal => "Initialize (no backend)",
            StepKind::Validate => "Validate configuration",
            StepKind::Plan => "Plan changes",
            StepKind::RenderPlan => "Render plan as JSON",
            StepKind::InitBackend => "Initialize remote backend",
            StepKind::Confirm => "Confirm destroy",
            StepKind::Apply => "Apply plan",
            StepKind::Destroy => "Destroy infrastructure",
        }
    }

    pub fn effect(self) -> Effect {
        match self {
            StepKind::LoadCredentials | StepKind::Validate | StepKind::Confirm => Effect::ReadOnly,
            StepKind::MergeVariables
            | StepKind::ConfigureMirror
            | StepKind::InitLocal
            | StepKind::Plan
            | StepKind::RenderPlan
            | StepKind::InitBackend => Effect::MutatesLocal,
            StepKind::Apply | StepKind::Destroy => Effect::MutatesRemote,
        }
    }

    /// State the run enters once this step succeeds, if it changes state.
    pub fn reaches(self) -> Option<State> {
        match self {
            StepKind::LoadCredentials => Some(State::CredentialsLoaded),
            StepKind::MergeVariables => Some(State::ConfigMerged),
            StepKind::ConfigureMirror => Some(State::MirrorConfigured),
            StepKind::RenderPlan => Some(State::Planned),
            StepKind::Apply => Some(State::Applied),
            StepKind::Destroy => Some(State::Destroyed),
            _ => None,
        }
    }

    /// Output handling for steps that run the tool.
    pub fn output_mode(self) -> OutputMode {
        match self {
            StepKind::RenderPlan => OutputMode::Captured,
            _ => OutputMode::Streamed,
        }
    }
}

/// One step of a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowStep {
    pub name: &'static str,
    pub kind: StepKind,
    pub effect: Effect,
    /// Steps that must have succeeded earlier in the same run.
    pub requires: Vec<&'static str>,
}

impl WorkflowStep {
    fn new(kind: StepKind, requires: &[StepKind]) -> Self {
        Self {
            name: kind.name(),
            kind,
            effect: kind.effect(),
            requires: requires.iter().map(|k| k.name()).collect(),
        }
    }
}

/// An action's ordered steps.
#[derive(Debug, Clone)]
pub struct Workflow {
    pub action: Action,
    pub steps: Vec<WorkflowStep>,
}

impl Workflow {
    pub fn for_action(action: Action) -> Self {
        let steps = match action {
            Action::Plan => plan_steps(),
            Action::Apply => {
                let mut steps = plan_steps();
                steps.push(WorkflowStep::new(
                    StepKind::InitBackend,
                    &[StepKind::RenderPlan],
                ));
                steps.push(WorkflowStep::new(
                    StepKind::Apply,
                    &[StepKind::InitBackend, StepKind::Plan],
                ));
                steps
            }
            Action::Destroy => {
                let mut steps = prepare_steps();
                steps.push(WorkflowStep::new(
                    StepKind::InitBackend,
                    &[StepKind::ConfigureMirror],
                ));
                steps.push(WorkflowStep::new(StepKind::Confirm, &[StepKind::InitBackend]));
                steps.push(WorkflowStep::new(
                    StepKind::Destroy,
                    &[StepKind::Confirm, StepKind::MergeVariables],
                ));
                steps
            }
        };
        Self { action, steps }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name).collect()
    }
}

fn prepare_steps() -> Vec<WorkflowStep> {
    vec![
        WorkflowStep::new(StepKind::LoadCredentials, &[]),
        WorkflowStep::new(StepKind::MergeVariables, &[StepKind::LoadCredentials]),
        WorkflowStep::new(StepKind::ConfigureMirror, &[StepKind::MergeVariables]),
    ]
}

fn plan_steps() -> Vec<WorkflowStep> {
    let mut steps = prepare_steps();
    steps.push(WorkflowStep::new(
        StepKind::InitLocal,
        &[StepKind::ConfigureMirror],
    ));
    steps.push(WorkflowStep::new(StepKind::Validate, &[StepKind::InitLocal]));
    steps.push(WorkflowStep::new(
        StepKind::Plan,
        &[StepKind::Validate, StepKind::MergeVariables],
    ));
    steps.push(WorkflowStep::new(StepKind::RenderPlan, &[StepKind::Plan]));
    steps
}
