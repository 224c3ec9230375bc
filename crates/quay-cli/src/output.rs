//! Terminal output formatting utilities.

use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use quay_git::{ChangeType, CommitsAheadAndBehind};

static QUIET_MODE: AtomicBool = AtomicBool::new(false);

/// Set quiet mode globally. Call once at startup.
pub fn set_quiet(quiet: bool) {
    QUIET_MODE.store(quiet, Ordering::Relaxed);
}

fn is_quiet() -> bool {
    QUIET_MODE.load(Ordering::Relaxed)
}

/// Print a success message (suppressed in quiet mode).
pub fn success(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "✓".green(), msg);
    }
}

/// Print an error message (always prints to stderr).
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a warning message (always prints to stderr).
pub fn warn(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print an info message (suppressed in quiet mode).
pub fn info(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "→".blue(), msg);
    }
}

/// Print a detail line without prefix (suppressed in quiet mode).
pub fn detail(msg: &str) {
    if !is_quiet() {
        println!("{msg}");
    }
}

/// Print essential machine-readable output (always prints).
///
/// Use for results that should be available for piping, like JSON.
pub fn essential(msg: &str) {
    println!("{msg}");
}

/// Colored one-letter marker for a change.
#[must_use]
pub fn change_marker(change: ChangeType, staged: bool) -> String {
    let marker = change.marker().to_string();
    match change {
        ChangeType::Conflict => marker.red().bold().to_string(),
        ChangeType::Untracked => marker.dimmed().to_string(),
        ChangeType::Submodule => marker.cyan().to_string(),
        _ if staged => marker.green().to_string(),
        _ if change.is_removal() => marker.red().to_string(),
        _ => marker.yellow().to_string(),
    }
}

/// Marker showing where a commit sits relative to the upstream.
///
/// `↑` still has to be pushed, `↓` still has to be pulled, `▶` is the local
/// branch head.
#[must_use]
pub fn commit_marker(
    commit_id: &str,
    head: Option<&str>,
    ahead_behind: Option<&CommitsAheadAndBehind>,
) -> String {
    if head == Some(commit_id) {
        return "▶".cyan().to_string();
    }
    match ahead_behind {
        Some(ab) if ab.is_ahead(commit_id) => "↑".green().to_string(),
        Some(ab) if ab.is_behind(commit_id) => "↓".yellow().to_string(),
        _ => " ".to_string(),
    }
}

/// Print a horizontal line (suppressed in quiet mode).
pub fn hr() {
    if !is_quiet() {
        println!("{}", "─".repeat(50).dimmed());
    }
}
