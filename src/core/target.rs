//! Deployment targets and the paths derived from them.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::constants;
use crate::core::settings::LayoutSettings;
use crate::error::{ConfigError, Result};

/// One deployment unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub app: String,
    pub cloud: String,
    pub env: String,
}

impl Target {
    /// Create a target, validating each identifier.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if an identifier is empty or could
    /// escape the project root when substituted into a path.
    pub fn new(app: &str, cloud: &str, env: &str) -> Result<Self> {
        validate_identifier("app", app)?;
        validate_identifier("cloud", cloud)?;
        validate_identifier("env", env)?;
        Ok(Self {
            app: app.to_string(),
            cloud: cloud.to_string(),
            env: env.to_string(),
        })
    }

    /// Substitute `{app}`, `{cloud}` and `{env}` in a path template.
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{app}", &self.app)
            .replace("{cloud}", &self.cloud)
            .replace("{env}", &self.env)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.app, self.cloud, self.env)
    }
}

fn validate_identifier(field: &'static str, value: &str) -> Result<()> {
    let reason = if value.is_empty() {
        Some("cannot be empty".to_string())
    } else if value.starts_with('.') {
        Some(format!("'{}' cannot start with '.'", value))
    } else if value.contains(['/', '\\']) {
        Some(format!("'{}' cannot contain path separators", value))
    } else if value.chars().any(char::is_whitespace) {
        Some(format!("'{}' cannot contain whitespace", value))
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ConfigError::InvalidValue { field, reason }.into()),
        None => Ok(()),
    }
}

/// Every path a run reads or writes.
#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub root: PathBuf,
    pub vars_dir: PathBuf,
    pub composition_dir: PathBuf,
    pub backend_config: PathBuf,
    pub merged_output: PathBuf,
    pub plugin_cache: PathBuf,
}

impl Layout {
    /// Resolve the layout templates for `target` against `root`.
    ///
    /// The merged output resolves against the composition directory, which
    /// is what the run lock guards.
    pub fn resolve(root: &Path, target: &Target, layout: &LayoutSettings) -> Self {
        let at = |base: &Path, template: &str| absolutize(base, &target.render(template));
        let composition_dir = at(root, &layout.composition_dir);
        Self {
            root: root.to_path_buf(),
            vars_dir: at(root, &layout.vars_dir),
            backend_config: at(root, &layout.backend_config),
            merged_output: at(&composition_dir, &layout.merged_output),
            plugin_cache: at(root, &layout.plugin_cache),
            composition_dir,
        }
    }

    /// Provider mirror CLI configuration file.
    pub fn mirror_config(&self) -> PathBuf {
        self.composition_dir.join(constants::MIRROR_CONFIG_FILE)
    }

    /// Binary plan artifact.
    pub fn plan_file(&self) -> PathBuf {
        self.composition_dir.join(constants::PLAN_FILE)
    }

    /// JSON rendering of the plan artifact.
    pub fn plan_json(&self) -> PathBuf {
        self.composition_dir.join(constants::PLAN_JSON_FILE)
    }

    /// Run lock file.
    pub fn lock_file(&self) -> PathBuf {
        self.composition_dir.join(constants::LOCK_FILE)
    }
}

fn absolutize(root: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
