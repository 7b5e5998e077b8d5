//! Project settings.
//!
//! Handles reading `.tfflow.toml` from the project root. Every section is
//! optional; a missing file yields the built-in defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::constants;
use crate::error::{ConfigError, Result};

/// Project settings stored in `.tfflow.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub tfflow: Meta,
    #[serde(default)]
    pub target: TargetDefaults,
    #[serde(default)]
    pub layout: LayoutSettings,
    #[serde(default)]
    pub variables: VariableSettings,
    #[serde(default)]
    pub credentials: CredentialSettings,
}

/// Tool invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Meta {
    /// Provisioning tool binary name or path.
    #[serde(default = "default_tool")]
    pub tool: String,
    /// Per-command timeout; unset means wait indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            tool: default_tool(),
            timeout_secs: None,
        }
    }
}

fn default_tool() -> String {
    constants::DEFAULT_TOOL.to_string()
}

/// Default target identifiers when none are given on the command line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetDefaults {
    pub app: Option<String>,
    pub cloud: Option<String>,
    pub env: Option<String>,
}

/// Path templates, relative to the project root unless absolute.
/// `merged_output` is relative to the composition directory instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutSettings {
    pub vars_dir: String,
    pub composition_dir: String,
    pub backend_config: String,
    pub merged_output: String,
    pub plugin_cache: String,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            vars_dir: constants::VARS_DIR_TEMPLATE.to_string(),
            composition_dir: constants::COMPOSITION_DIR_TEMPLATE.to_string(),
            backend_config: constants::BACKEND_CONFIG_TEMPLATE.to_string(),
            merged_output: constants::MERGED_OUTPUT.to_string(),
            plugin_cache: constants::PLUGIN_CACHE.to_string(),
        }
    }
}

/// Sensitive variable handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VariableSettings {
    /// Variable names passed only as discrete `-var` arguments.
    pub sensitive: Vec<String>,
    /// Omit sensitive variables from the merged document on disk.
    pub redact: bool,
}

impl Default for VariableSettings {
    fn default() -> Self {
        Self {
            sensitive: vec!["admin_public_key".to_string()],
            redact: true,
        }
    }
}

/// Credential file location and static defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CredentialSettings {
    pub file: Option<PathBuf>,
    /// Applied only when not already set, e.g. `AWS_PROFILE`.
    pub defaults: BTreeMap<String, String>,
}

impl Settings {
    /// Path to the settings file under `root`.
    pub fn path(root: &Path) -> PathBuf {
        root.join(constants::SETTINGS_FILE)
    }

    /// Load settings from `root`, falling back to defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Settings` if the TOML is malformed or has unknown
    /// fields, and `ConfigError::InvalidValue` on validation failure.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path(root);
        if !path.exists() {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        debug!(path = %path.display(), "loading settings");
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
            path: path.clone(),
            source,
        })?;
        let settings: Self = toml::from_str(&contents).map_err(ConfigError::Settings)?;
        settings.validate()?;

        Ok(settings)
    }

    /// Validate settings contents.
    pub fn validate(&self) -> Result<()> {
        if self.tfflow.tool.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "tfflow.tool",
                reason: "cannot be empty".to_string(),
            }
            .into());
        }

        if self.tfflow.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "tfflow.timeout_secs",
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }

        for name in &self.variables.sensitive {
            if name.is_empty() || name.contains('=') {
                return Err(ConfigError::InvalidValue {
                    field: "variables.sensitive",
                    reason: format!("'{}' is not a valid variable name", name),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Configured per-command timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.tfflow.timeout_secs.map(Duration::from_secs)
    }

    /// Credential file from settings, with a leading `~/` expanded.
    pub fn credentials_file(&self) -> Option<PathBuf> {
        let file = self.credentials.file.as_ref()?;
        match file.strip_prefix("~") {
            Ok(rest) => dirs::home_dir().map(|home| home.join(rest)),
            Err(_) => Some(file.clone()),
        }
    }
}
