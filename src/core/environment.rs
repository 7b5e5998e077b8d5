//! Environment context.
//!
//! Child processes receive the environment through this type rather than
//! through mutation of the process-wide environment, so runs are
//! reproducible and tests can inject their own values.

use std::collections::BTreeMap;

/// Base environment plus the values a run adds on top of it.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    base: BTreeMap<String, String>,
    overlay: BTreeMap<String, String>,
}

impl Environment {
    /// Snapshot the current process environment as the base.
    pub fn from_process() -> Self {
        Self {
            base: std::env::vars().collect(),
            overlay: BTreeMap::new(),
        }
    }

    /// An environment with nothing set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a base environment from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            base: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            overlay: BTreeMap::new(),
        }
    }

    /// Look up a value, preferring the overlay.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.overlay
            .get(key)
            .or_else(|| self.base.get(key))
            .map(String::as_str)
    }

    /// Whether a key is visible, in either layer.
    pub fn contains(&self, key: &str) -> bool {
        self.overlay.contains_key(key) || self.base.contains_key(key)
    }

    /// Set a value only if nothing is set for `key` yet.
    ///
    /// Returns `true` if the value was applied.
    pub fn set_if_absent(&mut self, key: &str, value: &str) -> bool {
        if self.contains(key) {
            return false;
        }
        self.overlay.insert(key.to_string(), value.to_string());
        true
    }

    /// Set a value unconditionally.
    pub fn set(&mut self, key: &str, value: &str) {
        self.overlay.insert(key.to_string(), value.to_string());
    }

    /// Values added during the run, to be passed to child processes.
    pub fn overlay(&self) -> &BTreeMap<String, String> {
        &self.overlay
    }
}
