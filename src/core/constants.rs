//! Constants used throughout tfflow.
//!
//! Centralizes file names and layout defaults.

/// Project settings file name (.tfflow.toml).
pub const SETTINGS_FILE: &str = ".tfflow.toml";

/// Default provisioning tool binary.
pub const DEFAULT_TOOL: &str = "terraform";

/// Default application name.
pub const DEFAULT_APP: &str = "ovr-app-infra";

/// Default cloud provider.
pub const DEFAULT_CLOUD: &str = "azure";

/// Default environment.
pub const DEFAULT_ENV: &str = "dev";

/// Variable fragment directory template.
pub const VARS_DIR_TEMPLATE: &str = "{app}/{cloud}/{env}/vars";

/// Composition directory template.
pub const COMPOSITION_DIR_TEMPLATE: &str = "terraform-platform/{cloud}/infra-stack";

/// Backend configuration file template.
pub const BACKEND_CONFIG_TEMPLATE: &str = "{app}/{cloud}/{env}/backend.tf";

/// Merged variable document path, relative to the composition directory so
/// the run lock covers it.
pub const MERGED_OUTPUT: &str = "{app}-{env}.tfvars.json";

/// Shared plugin cache, relative to the project root.
pub const PLUGIN_CACHE: &str = "terraform-platform/.terraform.d/plugins";

/// Provider mirror CLI configuration, relative to the composition directory.
pub const MIRROR_CONFIG_FILE: &str = ".terraformrc";

/// Environment variable the provisioning tool reads its CLI configuration from.
pub const CLI_CONFIG_ENV: &str = "TF_CLI_CONFIG_FILE";

/// Plan binary artifact, relative to the composition directory.
pub const PLAN_FILE: &str = "precheck.tfplan";

/// JSON rendering of the plan, relative to the composition directory.
pub const PLAN_JSON_FILE: &str = "precheck.json";

/// Run lock, relative to the composition directory.
pub const LOCK_FILE: &str = ".tfflow.lock";

/// Environment variable overriding the credential file location.
pub const CREDENTIALS_ENV: &str = "TFFLOW_CREDENTIALS_FILE";

/// Fragment file extensions, in no particular order.
pub const FRAGMENT_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Placeholder shown instead of sensitive values.
pub const REDACTED: &str = "***";
