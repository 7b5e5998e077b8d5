//! Provider mirror configuration.
//!
//! Points the provisioning tool at a pre-populated plugin cache so `init`
//! never downloads providers.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::Result;

/// CLI configuration content for a filesystem mirror at `cache`.
///
/// Paths use forward slashes, as the configuration language requires on
/// every platform.
pub fn render(cache: &Path) -> String {
    let cache = cache.to_string_lossy().replace('\\', "/");
    format!(
        "provider_installation {{\n  filesystem_mirror {{\n    path = \"{}\"\n  }}\n  direct {{\n    exclude = [\"*/*\"]\n  }}\n}}\n",
        escape(&cache)
    )
}

fn escape(value: &str) -> String {
    value.replace('"', "\\\"")
}

/// Write the mirror configuration to `config_path`.
///
/// Overwrites any existing file; identical inputs produce identical content.
pub fn configure(config_path: &Path, cache: &Path) -> Result<()> {
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = render(cache);
    fs::write(config_path, &content)?;
    debug!(
        path = %config_path.display(),
        cache = %cache.display(),
        "provider mirror configured"
    );

    Ok(())
}
