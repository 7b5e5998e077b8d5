//! External command execution.
//!
//! Commands are always built as argument vectors and never passed through a
//! shell. Secret arguments are masked whenever a command is displayed.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::core::constants;
use crate::error::{Result, StepError};

/// How long a terminated child gets to exit before it is killed.
const TERMINATE_GRACE: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One command-line argument.
#[derive(Clone)]
pub enum Arg {
    Plain(String),
    /// An argument carrying a secret. `display` is shown in logs, `value`
    /// is what the child receives.
    Secret {
        display: String,
        value: Zeroizing<String>,
    },
}

impl Arg {
    /// The value passed to the child process.
    pub fn value(&self) -> &str {
        match self {
            Arg::Plain(s) => s,
            Arg::Secret { value, .. } => value,
        }
    }

    /// The value shown to operators.
    pub fn display(&self) -> &str {
        match self {
            Arg::Plain(s) => s,
            Arg::Secret { display, .. } => display,
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.display())
    }
}

/// A command to execute.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<Arg>,
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Plain(arg.into()));
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|a| Arg::Plain(a.into())));
        self
    }

    /// Append `-var=NAME=VALUE`, displayed as `-var=NAME=***`.
    pub fn secret_var(mut self, name: &str, value: &str) -> Self {
        self.args.push(Arg::Secret {
            display: format!("-var={}={}", name, constants::REDACTED),
            value: Zeroizing::new(format!("-var={}={}", name, value)),
        });
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn envs(mut self, vars: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Subcommand name: the first plain argument.
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(Arg::display)
    }

    /// Whether any argument carries a secret.
    pub fn has_secrets(&self) -> bool {
        self.args.iter().any(|a| matches!(a, Arg::Secret { .. }))
    }

    /// Shell-quoted command line with secrets masked.
    pub fn display_line(&self) -> String {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(self.program.as_str());
        words.extend(self.args.iter().map(Arg::display));
        shell_words::join(words)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_line())
    }
}

/// Output handling for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Forward output live to our stdout/stderr while also capturing it.
    Streamed,
    /// Buffer output without forwarding.
    Captured,
}

/// Result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the child was ended by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Executes commands. Implemented by [`ProcessRunner`]; tests substitute
/// their own.
pub trait CommandRunner {
    /// Run `spec` to completion and return its output, whatever the exit code.
    ///
    /// # Errors
    ///
    /// Returns `StepError::Spawn` if the program cannot be started and
    /// `StepError::TimedOut` if it exceeds the runner's timeout.
    fn run(&self, spec: &CommandSpec, mode: OutputMode) -> Result<CommandOutput>;
}

/// Turn a non-zero exit into `StepError::Failed`.
pub fn ensure_success(spec: &CommandSpec, output: CommandOutput) -> Result<CommandOutput> {
    if output.success() {
        return Ok(output);
    }
    Err(StepError::Failed {
        command: spec.display_line(),
        exit_code: output.exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
    }
    .into())
}

/// Runs commands as child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
    quiet: bool,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminate commands that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Capture streamed output without forwarding it, so stdout stays free
    /// for machine-readable results.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, spec: &CommandSpec, mode: OutputMode) -> Result<CommandOutput> {
        debug!(command = %spec, cwd = ?spec.cwd, ?mode, "running command");

        let mut cmd = Command::new(&spec.program);
        cmd.args(spec.args.iter().map(Arg::value))
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| StepError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        let stream = mode == OutputMode::Streamed && !self.quiet;
        let stdout = child.stdout.take().map(|pipe| {
            let forward: Option<Box<dyn Write + Send>> = stream.then(|| Box::new(io::stdout()) as _);
            drain(pipe, forward)
        });
        let stderr = child.stderr.take().map(|pipe| {
            let forward: Option<Box<dyn Write + Send>> = stream.then(|| Box::new(io::stderr()) as _);
            drain(pipe, forward)
        });

        let status = match wait(&mut child, self.timeout)? {
            Some(status) => status,
            None => {
                return Err(StepError::TimedOut {
                    command: spec.display_line(),
                    after: self.timeout.unwrap_or_default(),
                    stdout: collect(stdout),
                    stderr: collect(stderr),
                }
                .into());
            }
        };

        let output = CommandOutput {
            exit_code: status.code(),
            stdout: collect(stdout),
            stderr: collect(stderr),
        };
        debug!(exit_code = ?output.exit_code, "command finished");
        Ok(output)
    }
}

/// Read a pipe to the end on a helper thread, optionally copying each chunk
/// to `forward`.
fn drain<R>(mut pipe: R, mut forward: Option<Box<dyn Write + Send>>) -> JoinHandle<Vec<u8>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut captured = Vec::new();
        let mut buf = [0u8; 8192];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if let Some(out) = forward.as_mut() {
                        let _ = out.write_all(&buf[..n]);
                        let _ = out.flush();
                    }
                    captured.extend_from_slice(&buf[..n]);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        captured
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Wait for `child`, terminating it once `timeout` elapses.
///
/// Returns `None` when the child had to be stopped.
fn wait(child: &mut Child, timeout: Option<Duration>) -> io::Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return child.wait().map(Some);
    };

    let start = Instant::now();
    while start.elapsed() < timeout {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        thread::sleep(POLL_INTERVAL);
    }

    warn!(
        pid = child.id(),
        timeout_secs = timeout.as_secs(),
        "command timed out, terminating"
    );
    terminate(child);
    Ok(None)
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let pid = Pid::from_raw(child.id() as i32);
    if signal::kill(pid, Signal::SIGTERM).is_ok() {
        let start = Instant::now();
        while start.elapsed() < TERMINATE_GRACE {
            if let Ok(Some(_)) = child.try_wait() {
                return;
            }
            thread::sleep(POLL_INTERVAL);
        }
        warn!(pid = child.id(), "command ignored SIGTERM, killing");
    }
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
