//! Shared CLI output helpers.
//!
//! Status lines go to stderr so stdout carries only tool output and, with
//! `--json`, the run report.
//!
//! Color scheme (respects NO_COLOR):
//! - Green: success, checkmarks
//! - Red: errors, destructive warnings
//! - Yellow: warnings, cancellation
//! - Cyan: paths, hints
//! - Dimmed: commands, timings

use std::fmt::Display;
use std::time::Duration;

use console::{style, StyledObject};

const RULE_WIDTH: usize = 56;

/// Check if color output is disabled via NO_COLOR env var.
fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

fn paint<D>(value: D, f: impl FnOnce(StyledObject<D>) -> StyledObject<D>) -> String
where
    D: Display,
{
    if colors_enabled() {
        f(style(value)).for_stderr().to_string()
    } else {
        value.to_string()
    }
}

/// Print a success message with checkmark.
///
/// Example: `✓ plan complete`
pub fn success(msg: &str) {
    eprintln!("{} {}", paint("✓", |s| s.green()), msg);
}

/// Print an error message.
///
/// Example: `✗ variable directory not found: ...`
pub fn error(msg: &str) {
    eprintln!("{} {}", paint("✗", |s| s.red()), msg);
}

/// Print a warning message.
///
/// Example: `⚠ credential file not found`
pub fn warn(msg: &str) {
    eprintln!("{} {}", paint("⚠", |s| s.yellow()), msg);
}

/// Print a hint message.
///
/// Example: `→ install the tool or pass --tool with its path`
pub fn hint(msg: &str) {
    eprintln!("{} {}", paint("→", |s| s.cyan()), paint(msg, |s| s.cyan()));
}

/// Print a bold header.
pub fn header(title: &str) {
    eprintln!("{}", paint(title, |s| s.bold()));
}

/// Print a key-value pair (label dimmed, value bold).
///
/// Example: `  target  ovr-app-infra/azure/dev`
pub fn kv(label: &str, value: impl Display) {
    eprintln!(
        "  {}  {}",
        paint(label, |s| s.dim()),
        paint(value.to_string(), |s| s.bold())
    );
}

/// Print a horizontal rule separator.
pub fn rule() {
    eprintln!("{}", paint("─".repeat(RULE_WIDTH), |s| s.dim()));
}

/// Format a path in cyan for inline use.
pub fn path(p: impl Display) -> String {
    paint(p.to_string(), |s| s.cyan())
}

/// Print a step heading.
///
/// Example: `[4/7] Initialize (no backend)`
pub fn step(index: usize, total: usize, title: &str) {
    let counter = format!("[{}/{}]", index + 1, total);
    eprintln!("{} {}", paint(counter, |s| s.dim()), paint(title, |s| s.bold()));
}

/// Print the command a step is about to run.
///
/// Example: `  $ terraform validate`
pub fn command(line: &str) {
    eprintln!("  {}", paint(format!("$ {}", line), |s| s.dim()));
}

/// Print a step result line with its duration.
pub fn step_result(ok: Option<bool>, name: &str, elapsed: Duration, note: Option<&str>) {
    let mark = match ok {
        Some(true) => paint("✓", |s| s.green()),
        Some(false) => paint("✗", |s| s.red()),
        None => paint("⚠", |s| s.yellow()),
    };
    let timing = paint(format!("({})", format_duration(elapsed)), |s| s.dim());
    match note {
        Some(note) => eprintln!("  {} {} {}  {}", mark, name, timing, note),
        None => eprintln!("  {} {} {}", mark, name, timing),
    }
}

/// Print a prominent warning box for destructive actions.
pub fn danger(lines: &[String]) {
    let border = paint("!".repeat(RULE_WIDTH), |s| s.red().bold());
    eprintln!();
    eprintln!("{}", border);
    for line in lines {
        eprintln!("{}", paint(line, |s| s.red().bold()));
    }
    eprintln!("{}", border);
    eprintln!();
}

/// Print captured output indented under a failure.
pub fn captured(label: &str, text: &str) {
    let text = text.trim_end();
    if text.is_empty() {
        return;
    }
    eprintln!("  {}", paint(label, |s| s.dim()));
    for line in text.lines() {
        eprintln!("    {}", line);
    }
}

/// Short human form of a duration: `850ms`, `12.4s`, `3m07s`.
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis < 1_000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        let secs = d.as_secs();
        format!("{}m{:02}s", secs / 60, secs % 60)
    }
}
