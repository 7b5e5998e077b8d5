//! Confirmation for destructive actions.

use std::io::{self, BufRead, IsTerminal};

use dialoguer::Input;
use tracing::debug;

use crate::error::Result;

/// How the engine obtains operator approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Ask on the terminal, or read one line from piped stdin.
    Interactive,
    /// Approval given up front (`--yes`); no prompt is shown.
    PreApproved,
    /// Always decline.
    Denied,
}

impl Confirmation {
    /// Pick `PreApproved` when `yes` is set, `Interactive` otherwise.
    pub fn from_flag(yes: bool) -> Self {
        if yes {
            Confirmation::PreApproved
        } else {
            Confirmation::Interactive
        }
    }

    /// Whether this variant prompts the operator.
    pub fn prompts(&self) -> bool {
        matches!(self, Confirmation::Interactive)
    }

    /// Ask for approval with `prompt`.
    pub fn confirm(&self, prompt: &str) -> Result<bool> {
        match self {
            Confirmation::PreApproved => Ok(true),
            Confirmation::Denied => Ok(false),
            Confirmation::Interactive => {
                let response = if io::stdin().is_terminal() {
                    Input::<String>::new()
                        .with_prompt(prompt)
                        .allow_empty(true)
                        .interact_text()?
                } else {
                    eprint!("{}: ", prompt);
                    let mut line = String::new();
                    io::stdin().lock().read_line(&mut line)?;
                    eprintln!();
                    line
                };
                let approved = is_affirmative(&response);
                debug!(approved, "confirmation answered");
                Ok(approved)
            }
        }
    }
}

/// `yes` or `y`, ignoring case and surrounding whitespace.
pub fn is_affirmative(response: &str) -> bool {
    let response = response.trim();
    response.eq_ignore_ascii_case("yes") || response.eq_ignore_ascii_case("y")
}
