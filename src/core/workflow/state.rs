//! Run state machine.

use serde::Serialize;

use crate::error::{Error, Result};

/// Where a run is.
///
/// ```text
/// Init → CredentialsLoaded → ConfigMerged → MirrorConfigured → Planned → Applied → Done
///                                                  │               └──────────────→ Done
///                                                  └─────────────→ Destroyed ─────→ Done
/// ```
///
/// `Failed` is reachable from every non-terminal state, `Canceled` from every
/// non-terminal state after `Init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum State {
    Init,
    CredentialsLoaded,
    ConfigMerged,
    MirrorConfigured,
    Planned,
    Applied,
    Destroyed,
    Done,
    Failed,
    Canceled,
}

impl State {
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Done | State::Failed | State::Canceled)
    }

    /// Whether `next` directly follows `self`.
    pub fn can_advance_to(self, next: State) -> bool {
        use State::*;

        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Failed) => true,
            (Init, Canceled) => false,
            (_, Canceled) => true,
            (Init, CredentialsLoaded)
            | (CredentialsLoaded, ConfigMerged)
            | (ConfigMerged, MirrorConfigured)
            | (MirrorConfigured, Planned)
            | (MirrorConfigured, Destroyed)
            | (Planned, Applied)
            | (Planned, Done)
            | (Applied, Done)
            | (Destroyed, Done) => true,
            _ => false,
        }
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` for a transition the machine does not allow.
    pub fn advance(self, next: State) -> Result<State> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(Error::Internal(format!(
                "invalid state transition {:?} -> {:?}",
                self, next
            )))
        }
    }
}
