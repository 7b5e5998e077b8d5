//! Plan artifacts.
//!
//! A plan is only applied in the run that produced it. Leftover artifacts are
//! removed before planning, and the binary's digest is checked again right
//! before apply.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};

/// A plan produced during the current run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanArtifact {
    pub plan: PathBuf,
    pub json: PathBuf,
    /// Hex SHA-256 of the plan binary when it was produced.
    pub sha256: String,
}

impl PlanArtifact {
    /// Record the plan at `plan` and its JSON rendering at `json`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if the tool reported success but left no
    /// plan file behind.
    pub fn capture(plan: &Path, json: &Path) -> Result<Self> {
        if !plan.is_file() {
            return Err(Error::Internal(format!(
                "plan succeeded but {} was not written",
                plan.display()
            )));
        }
        let sha256 = digest(plan)?;
        debug!(plan = %plan.display(), %sha256, "captured plan artifact");
        Ok(Self {
            plan: plan.to_path_buf(),
            json: json.to_path_buf(),
            sha256,
        })
    }

    /// Confirm the plan binary is unchanged since it was captured.
    pub fn verify(&self) -> Result<()> {
        let current = if self.plan.is_file() {
            digest(&self.plan)?
        } else {
            return Err(Error::Internal(format!(
                "plan artifact {} disappeared before apply",
                self.plan.display()
            )));
        };

        if current != self.sha256 {
            return Err(Error::Internal(format!(
                "plan artifact {} changed since it was produced",
                self.plan.display()
            )));
        }
        Ok(())
    }
}

/// Remove plan files left by an earlier run.
///
/// Returns the number of files removed.
pub fn clear_stale(paths: &[&Path]) -> Result<usize> {
    let mut removed = 0;
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed stale plan artifact");
                removed += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(removed)
}

fn digest(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}
