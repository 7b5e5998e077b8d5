//! Variable fragment merging.
//!
//! Combines the YAML and JSON fragments of a variable directory into one
//! document. Fragments are applied in file-name order; later fragments win
//! key by key, nested mappings merge recursively, and lists are replaced.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::core::constants;
use crate::core::variables::VariableDocument;
use crate::error::{ConfigError, Result};

/// A merge result and where it was written.
#[derive(Debug, Clone)]
pub struct Merged {
    pub document: VariableDocument,
    pub path: PathBuf,
}

/// Options for writing the merged document.
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Variable names to mark sensitive.
    pub sensitive: Vec<String>,
    /// Omit sensitive variables from the written file.
    pub redact: bool,
}

/// List fragment files in `dir`, sorted by file name.
///
/// # Errors
///
/// Returns `ConfigError::MissingDir` if `dir` is not a directory and
/// `ConfigError::EmptyDir` if it holds no fragments.
pub fn fragments(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ConfigError::MissingDir(dir.to_path_buf()).into());
    }

    let entries = fs::read_dir(dir).map_err(|source| ConfigError::ReadFile {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden || !path.is_file() {
            continue;
        }
        if is_fragment(&path) {
            files.push(path);
        } else {
            debug!(path = %path.display(), "ignoring non-fragment file");
        }
    }

    if files.is_empty() {
        return Err(ConfigError::EmptyDir(dir.to_path_buf()).into());
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn is_fragment(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            constants::FRAGMENT_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Parse one fragment into a mapping.
pub fn load_fragment(path: &Path) -> Result<Map<String, Value>> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let value: Value = if is_json {
        serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?
    } else if contents.trim().is_empty() {
        Value::Null
    } else {
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(ConfigError::NotAMapping(path.to_path_buf()).into()),
    }
}

/// Merge `overlay` into `base`.
///
/// Mappings present on both sides merge recursively; any other value in
/// `overlay` replaces the one in `base`.
pub fn merge_into(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        let Value::Object(incoming) = value else {
            base.insert(key, value);
            continue;
        };
        if let Some(Value::Object(existing)) = base.get_mut(&key) {
            merge_into(existing, incoming);
            continue;
        }
        base.insert(key, Value::Object(incoming));
    }
}

/// Merge every fragment in `dir` in order.
pub fn merge_dir(dir: &Path) -> Result<Map<String, Value>> {
    let mut merged = Map::new();
    for path in fragments(dir)? {
        debug!(path = %path.display(), "merging fragment");
        merge_into(&mut merged, load_fragment(&path)?);
    }
    Ok(merged)
}

/// Canonical serialized form: pretty JSON with sorted keys and a trailing
/// newline.
pub fn render(values: &Map<String, Value>) -> Result<String> {
    let mut out = serde_json::to_string_pretty(values)
        .map_err(|e| crate::error::Error::Internal(format!("failed to render JSON: {}", e)))?;
    out.push('\n');
    Ok(out)
}

/// Merge `dir` and write the result to `output`.
///
/// With `redact` set, sensitive variables are left out of the file. Without
/// it, the file is written owner-only on Unix since it carries secrets.
pub fn merge_to_file(dir: &Path, output: &Path, options: &MergeOptions) -> Result<Merged> {
    let values = merge_dir(dir)?;
    let document = VariableDocument::new(values, &options.sensitive);

    let restricted = !options.redact && !document.sensitive().is_empty();
    let content = if options.redact {
        render(&document.redacted())?
    } else {
        render(document.values())?
    };

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    write_file(output, &content, restricted)?;

    debug!(
        path = %output.display(),
        variables = document.values().len(),
        sensitive = document.sensitive().len(),
        "merged document written"
    );

    Ok(Merged {
        document,
        path: output.to_path_buf(),
    })
}

fn write_file(path: &Path, content: &str, restricted: bool) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

        let mode = if restricted { 0o600 } else { 0o644 };
        let mut file = fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .mode(mode)
            .open(path)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;

        // Ensure the mode even when overwriting an existing file.
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }

    #[cfg(not(unix))]
    {
        let _ = restricted;
        let mut file = fs::File::create(path)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
    }

    Ok(())
}
