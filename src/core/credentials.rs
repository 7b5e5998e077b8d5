//! Credential loading.
//!
//! Reads dotenv-style `KEY=VALUE` files into an [`Environment`] without
//! overriding anything that is already set.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::constants;
use crate::core::environment::Environment;
use crate::error::{ConfigError, Result};

/// Where credentials came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from a file.
    File {
        path: PathBuf,
        /// Keys applied from the file.
        applied: Vec<String>,
        /// Keys skipped because they were already set.
        skipped: Vec<String>,
    },
    /// No file found; relying on ambient credentials (an existing CLI
    /// session, managed identity, instance profile).
    Ambient { missing: Option<PathBuf> },
}

impl CredentialSource {
    /// Operator-facing notice for a missing credential file.
    pub fn warning(&self) -> Option<String> {
        match self {
            CredentialSource::Ambient {
                missing: Some(path),
            } => Some(format!(
                "credential file not found at {}, relying on existing session credentials",
                path.display()
            )),
            _ => None,
        }
    }
}

/// Resolve the credential file location.
///
/// An explicit path wins, then `TFFLOW_CREDENTIALS_FILE` from `env`, then the
/// per-cloud file in the platform config directory.
pub fn resolve_path(explicit: Option<&Path>, env: &Environment, cloud: &str) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env.get(constants::CREDENTIALS_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("tfflow").join(format!("{}.env", cloud)))
}

/// Load credentials into `env`.
///
/// File values are applied first, then `defaults`; both only fill keys that
/// are not already set.
pub fn load(
    env: &mut Environment,
    path: Option<&Path>,
    defaults: &BTreeMap<String, String>,
) -> Result<CredentialSource> {
    let source = match path {
        Some(path) if path.is_file() => {
            info!(path = %path.display(), "loading credentials");
            let contents = std::fs::read_to_string(path).map_err(|source| {
                ConfigError::ReadFile {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

            let mut applied = Vec::new();
            let mut skipped = Vec::new();
            for (key, value) in parse(&contents) {
                if env.set_if_absent(&key, &value) {
                    applied.push(key);
                } else {
                    skipped.push(key);
                }
            }
            debug!(
                applied = applied.len(),
                skipped = skipped.len(),
                "credentials applied"
            );

            CredentialSource::File {
                path: path.to_path_buf(),
                applied,
                skipped,
            }
        }
        Some(path) => {
            info!(
                path = %path.display(),
                "credential file not found, assuming existing session"
            );
            CredentialSource::Ambient {
                missing: Some(path.to_path_buf()),
            }
        }
        None => CredentialSource::Ambient { missing: None },
    };

    for (key, value) in defaults {
        if env.set_if_absent(key, value) {
            debug!(key = %key, "applied credential default");
        }
    }

    Ok(source)
}

/// Parse dotenv-style content into ordered pairs.
///
/// Skips empty lines, comments, and lines without `=`. Accepts an optional
/// `export ` prefix.
pub fn parse(contents: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for line in contents.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            pairs.push((key.to_string(), parse_value(value.trim())));
        }
    }

    pairs
}

fn parse_value(raw: &str) -> String {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return unescape_double_quoted(&raw[1..raw.len() - 1]);
    }

    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return raw[1..raw.len() - 1].to_string();
    }

    raw.to_string()
}

fn unescape_double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }

        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}
