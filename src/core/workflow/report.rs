//! Run results.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use super::definition::{Action, Effect};
use super::state::State;
use crate::core::plan::PlanArtifact;
use crate::core::runner::CommandOutput;
use crate::core::target::Target;
use crate::error::Error;

/// How a step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Succeeded,
    Failed,
    Canceled,
}

/// One entry of the ordered step log.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub name: &'static str,
    pub effect: Effect,
    pub status: StepStatus,
    /// Masked command line, for steps that ran the tool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip)]
    pub output: Option<CommandOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(serialize_with = "as_millis")]
    pub duration: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Terminal outcome of a run.
#[derive(Debug)]
pub enum Outcome {
    Succeeded,
    FailedAtStep { step: &'static str, error: Error },
    CanceledByUser,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded)
    }
}

/// Everything a run did, in order.
#[derive(Debug)]
pub struct WorkflowReport {
    pub action: Action,
    pub target: Target,
    pub state: State,
    pub steps: Vec<StepRecord>,
    pub outcome: Outcome,
    pub plan: Option<PlanArtifact>,
    pub merged_output: Option<PathBuf>,
}

impl WorkflowReport {
    /// Exit code for the process: zero on success or cancel, otherwise the
    /// failing step's code.
    pub fn exit_code(&self) -> i32 {
        match &self.outcome {
            Outcome::Succeeded | Outcome::CanceledByUser => 0,
            Outcome::FailedAtStep { error, .. } => error.exit_code(),
        }
    }

    /// Names of the steps that ran, in order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name).collect()
    }

    pub fn find(&self, name: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Serializable view of the report.
    pub fn summary(&self) -> ReportSummary<'_> {
        let (status, failed_step, error) = match &self.outcome {
            Outcome::Succeeded => ("succeeded", None, None),
            Outcome::FailedAtStep { step, error } => ("failed", Some(*step), Some(error.to_string())),
            Outcome::CanceledByUser => ("canceled", None, None),
        };
        ReportSummary {
            action: self.action,
            target: &self.target,
            status,
            state: self.state,
            failed_step,
            error,
            exit_code: self.exit_code(),
            steps: &self.steps,
            plan: self.plan.as_ref(),
            merged_output: self.merged_output.as_ref(),
        }
    }
}

/// JSON form of [`WorkflowReport`].
#[derive(Debug, Serialize)]
pub struct ReportSummary<'a> {
    pub action: Action,
    pub target: &'a Target,
    pub status: &'static str,
    pub state: State,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub exit_code: i32,
    pub steps: &'a [StepRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<&'a PlanArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_output: Option<&'a PathBuf>,
}
