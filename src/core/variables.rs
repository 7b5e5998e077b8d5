//! The merged variable document.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

/// Merged variables plus the names that must never reach disk or logs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableDocument {
    values: Map<String, Value>,
    sensitive: BTreeSet<String>,
}

impl VariableDocument {
    /// Wrap merged values, marking the listed names sensitive where present.
    pub fn new<S: AsRef<str>>(values: Map<String, Value>, sensitive: &[S]) -> Self {
        let sensitive = sensitive
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| values.contains_key(*name))
            .map(str::to_string)
            .collect();
        Self { values, sensitive }
    }

    /// All values, sensitive ones included.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Names of sensitive variables present in the document.
    pub fn sensitive(&self) -> &BTreeSet<String> {
        &self.sensitive
    }

    pub fn is_sensitive(&self, key: &str) -> bool {
        self.sensitive.contains(key)
    }

    /// Values with every sensitive variable removed.
    pub fn redacted(&self) -> Map<String, Value> {
        self.values
            .iter()
            .filter(|(k, _)| !self.sensitive.contains(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Sensitive variables as `(name, value)` pairs for `-var` arguments.
    ///
    /// Null and empty-string values are skipped. Strings are passed verbatim;
    /// other values use their JSON form, which the tool accepts for lists
    /// and maps.
    pub fn sensitive_args(&self) -> Vec<(String, String)> {
        self.sensitive
            .iter()
            .filter_map(|name| {
                let value = match self.values.get(name)? {
                    Value::Null => return None,
                    Value::String(s) if s.is_empty() => return None,
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Some((name.clone(), value))
            })
            .collect()
    }
}
