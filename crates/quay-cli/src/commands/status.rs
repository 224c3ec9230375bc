//! `quay status` command - Show staged and unstaged changes.

use anyhow::Result;
use colored::Colorize;
use quay_git::{FileStatus, WorkingCopyStatus};

use crate::commands::utils;
use crate::output;

/// Run the status command.
pub fn run(json: bool, assume_yes: bool) -> Result<()> {
    let session = utils::open_session(assume_yes)?;
    let status = session.status()?;

    if json {
        output::essential(&serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    print_status(&status);
    Ok(())
}

fn print_status(status: &WorkingCopyStatus) {
    if status.is_clean() {
        output::success("Working copy clean");
        return;
    }

    print_section("Staged", &status.staged, true);
    print_section("Unstaged", &status.unstaged, false);

    let conflicts = status.conflicts().count();
    if conflicts > 0 {
        output::warn(&format!(
            "{conflicts} conflict(s) - resolve with `quay resolve --mine` or `--theirs`"
        ));
    }
}

fn print_section(title: &str, files: &[FileStatus], staged: bool) {
    if files.is_empty() {
        return;
    }
    output::detail("");
    output::detail(&format!("  {}", title.bold()));
    output::hr();
    for file in files {
        output::detail(&format!(
            "  {} {}",
            output::change_marker(file.change_type, staged),
            file.path
        ));
    }
}
