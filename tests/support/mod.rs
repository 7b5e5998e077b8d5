//! Test support utilities for tfflow integration tests.
//!
//! Provides an isolated project tree and a fake provisioning tool.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Test environment with isolated temp directories.
///
/// Each test gets its own project root, home dir, and fake tool. No
/// process-global state is mutated, so tests can run in parallel.
pub struct Test {
    /// Project root passed as `--root`
    pub dir: TempDir,
    /// Temporary home directory
    pub home: TempDir,
}

impl Test {
    /// Create an empty project with the fake tool installed.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let home = TempDir::new().expect("failed to create temp home");
        let t = Self { dir, home };
        t.install_tool();
        t
    }

    /// Create a project with the default target's variables, backend, and
    /// composition directory in place.
    pub fn project() -> Self {
        let t = Self::new();
        t.write(&format!("{}/10-base.yaml", VARS_DIR), BASE_FRAGMENT);
        t.write(&format!("{}/20-overrides.json", VARS_DIR), OVERRIDE_FRAGMENT);
        t.write(BACKEND_FILE, BACKEND_CONFIG);
        fs::create_dir_all(t.path(COMPOSITION_DIR)).expect("failed to create composition dir");
        t
    }

    /// Absolute path of `rel` inside the project.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        fs::write(&path, contents).expect("failed to write file");
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).expect("failed to read file")
    }

    /// Fake tool binary.
    pub fn tool(&self) -> PathBuf {
        self.home.path().join("bin").join("terraform")
    }

    /// File the fake tool appends each invocation's arguments to.
    pub fn tool_log(&self) -> PathBuf {
        self.home.path().join("tool.log")
    }

    /// File the fake tool appends selected environment variables to.
    pub fn env_log(&self) -> PathBuf {
        self.home.path().join("env.log")
    }

    /// Environment lines recorded by the fake tool, one per invocation.
    pub fn tool_env(&self) -> Vec<String> {
        match fs::read_to_string(self.env_log()) {
            Ok(log) => log.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Subcommands the fake tool was invoked with, in order.
    pub fn invocations(&self) -> Vec<String> {
        match fs::read_to_string(self.tool_log()) {
            Ok(log) => log.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn install_tool(&self) {
        let tool = self.tool();
        fs::create_dir_all(tool.parent().unwrap()).expect("failed to create bin dir");
        fs::write(&tool, FAKE_TOOL).expect("failed to write fake tool");
        make_executable(&tool);
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .expect("failed to mark fake tool executable");
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}
