//! Error types for tfflow.
//!
//! Each concern has its own error enum; [`Error`] wraps them so callers can
//! propagate with `?` and the CLI can map failures onto exit codes.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Exit code for configuration problems (`EX_CONFIG`).
pub const EXIT_CONFIG: i32 = 78;

/// Exit code when another run holds the composition lock (`EX_TEMPFAIL`).
pub const EXIT_LOCKED: i32 = 75;

/// Exit code for unexpected internal states (`EX_SOFTWARE`).
pub const EXIT_INTERNAL: i32 = 70;

/// Exit code for a step that exceeded its timeout.
pub const EXIT_TIMEOUT: i32 = 124;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Step(#[from] StepError),

    #[error(transparent)]
    Lock(#[from] LockError),

    /// The operator declined a confirmation prompt.
    #[error("canceled by operator")]
    UserCanceled,

    /// An invariant of the workflow engine was violated.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit code for this error.
    ///
    /// Step failures mirror the failing subprocess; everything else maps to a
    /// reserved code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Step(StepError::Failed { exit_code, .. }) => match exit_code {
                Some(code) if *code != 0 => *code,
                _ => 1,
            },
            Error::Step(StepError::TimedOut { .. }) => EXIT_TIMEOUT,
            Error::Step(StepError::Spawn { .. }) => EXIT_INTERNAL,
            Error::Config(_) => EXIT_CONFIG,
            Error::Lock(_) => EXIT_LOCKED,
            Error::UserCanceled => 0,
            Error::Internal(_) | Error::Prompt(_) | Error::Io(_) => EXIT_INTERNAL,
        }
    }

    /// Captured output attached to the error, if any.
    pub fn captured_output(&self) -> Option<(&str, &str)> {
        match self {
            Error::Step(StepError::Failed { stdout, stderr, .. })
            | Error::Step(StepError::TimedOut { stdout, stderr, .. }) => {
                Some((stdout.as_str(), stderr.as_str()))
            }
            _ => None,
        }
    }
}

/// Configuration and variable-fragment errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("variable directory not found: {}", .0.display())]
    MissingDir(PathBuf),

    #[error("no variable fragments (.yaml, .yml, .json) in {}", .0.display())]
    EmptyDir(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("{} must contain a mapping at the top level", .0.display())]
    NotAMapping(PathBuf),

    #[error("failed to parse settings: {0}")]
    Settings(#[from] toml::de::Error),

    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("backend configuration not found: {}", .0.display())]
    MissingBackend(PathBuf),

    #[error("provisioning tool not found: {0}")]
    ToolNotFound(String),
}

/// External command errors.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("command failed with exit code {}: {command}", .exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    Failed {
        /// Masked command line.
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command timed out after {}s: {command}", .after.as_secs())]
    TimedOut {
        command: String,
        after: Duration,
        stdout: String,
        stderr: String,
    },
}

/// Run-lock errors.
#[derive(Error, Debug)]
pub enum LockError {
    #[error("another run holds {} ({holder})", .path.display())]
    Held { path: PathBuf, holder: String },

    #[error("failed to create lock {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
