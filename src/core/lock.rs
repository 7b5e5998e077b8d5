//! Run lock.
//!
//! One run per composition directory at a time. The lock is a file created
//! atomically; its presence means another run owns the directory, unless the
//! recorded process is gone from this host. A run killed by a signal never
//! reaches `Drop`, so such a lock is taken over with a warning.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{LockError, Result};

const UNKNOWN_HOST: &str = "unknown";

/// Contents of the lock file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    pub holder: String,
    #[serde(default)]
    pub host: String,
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
}

impl LockInfo {
    fn current() -> Self {
        let host = hostname();
        Self {
            holder: format!("{}@{}", whoami::username(), host),
            host,
            pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }

    fn read(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// True when the holder ran on this host and its process has exited.
    /// Locks from other hosts, or without a host, are never stale.
    fn is_stale(&self) -> bool {
        !self.host.is_empty()
            && self.host != UNKNOWN_HOST
            && self.host == hostname()
            && !process_alive(self.pid)
    }

    fn describe(&self) -> String {
        format!(
            "held by {} (pid {}) since {}",
            self.holder,
            self.pid,
            self.acquired_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

/// RAII guard for the run lock. Dropping it releases the lock.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    released: bool,
}

impl RunLock {
    /// Acquire the lock at `path`, failing fast if it is held.
    ///
    /// # Errors
    ///
    /// Returns `LockError::Held` if the lock file already exists and is not
    /// stale, and `LockError::Create` if it cannot be written.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| LockError::Create {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let opened = match create_new(path) {
            Err(e) if e.kind() == ErrorKind::AlreadyExists => match LockInfo::read(path) {
                Some(stale) if stale.is_stale() => {
                    warn!(
                        path = %path.display(),
                        pid = stale.pid,
                        "taking over stale run lock left by {}",
                        stale.holder
                    );
                    match fs::remove_file(path) {
                        Err(e) if e.kind() != ErrorKind::NotFound => {
                            return Err(LockError::Create {
                                path: path.to_path_buf(),
                                source: e,
                            }
                            .into())
                        }
                        _ => {}
                    }
                    create_new(path)
                }
                other => return Err(held(path, other.as_ref())),
            },
            other => other,
        };

        let mut file = match opened {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(held(path, LockInfo::read(path).as_ref()))
            }
            Err(source) => {
                return Err(LockError::Create {
                    path: path.to_path_buf(),
                    source,
                }
                .into())
            }
        };

        let lock = Self {
            path: path.to_path_buf(),
            released: false,
        };

        let info = LockInfo::current();
        let content = serde_json::to_string_pretty(&info)
            .map_err(|e| crate::error::Error::Internal(format!("failed to encode lock: {}", e)))?;
        file.write_all(content.as_bytes())
            .map_err(|source| LockError::Create {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(path = %path.display(), "acquired run lock");
        Ok(lock)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock explicitly.
    pub fn release(mut self) -> Result<()> {
        self.remove()
    }

    fn remove(&mut self) -> Result<()> {
        if !self.released {
            self.released = true;
            match fs::remove_file(&self.path) {
                Ok(()) => debug!(path = %self.path.display(), "released run lock"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

fn create_new(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
}

fn held(path: &Path, info: Option<&LockInfo>) -> crate::error::Error {
    LockError::Held {
        path: path.to_path_buf(),
        holder: info
            .map(LockInfo::describe)
            .unwrap_or_else(|| "holder unknown".to_string()),
    }
    .into()
}

fn hostname() -> String {
    whoami::fallible::hostname().unwrap_or_else(|_| UNKNOWN_HOST.to_string())
}

/// Signal 0 checks for existence without delivering anything. EPERM means
/// the process exists under another user.
#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return true;
    };
    if raw <= 0 {
        return true;
    }
    !matches!(signal::kill(Pid::from_raw(raw), None), Err(Errno::ESRCH))
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            warn!(path = %self.path.display(), error = %e, "failed to release run lock");
        }
    }
}
