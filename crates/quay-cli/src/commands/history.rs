//! `quay history` command - List the commits touching a path.

use anyhow::Result;
use colored::Colorize;
use quay_core::{HistoryOutcome, HistorySnapshot};
use quay_git::CommitCharacteristics;

use crate::commands::utils;
use crate::output;

/// Run the history command.
pub fn run(
    path: Option<&str>,
    limit: Option<usize>,
    no_fetch: bool,
    json: bool,
    assume_yes: bool,
) -> Result<()> {
    let session = utils::open_session_with(assume_yes, |config| {
        if limit.is_some() {
            config.history.limit = limit;
        }
        if no_fetch {
            config.history.fetch_before_load = false;
        }
    })?;

    let path = path.map(|arg| session.repo_path(arg)).transpose()?;
    let snapshot = match session.dispatcher.history().show_history(path.as_deref(), true)? {
        HistoryOutcome::Loading(pending) => utils::wait(pending, "load history")?,
        // Forced loads are always queued.
        HistoryOutcome::Unchanged => return Ok(()),
    };

    if json {
        output::essential(&serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    // An empty history was already reported by the notifier.
    if !snapshot.is_empty() {
        print_snapshot(&snapshot);
    }
    Ok(())
}

fn print_snapshot(snapshot: &HistorySnapshot) {
    let title = snapshot.path.as_deref().unwrap_or("repository");
    output::detail(&format!("  {}", title.bold()));
    output::hr();
    for commit in &snapshot.commits {
        output::essential(&format_row(snapshot, commit));
    }
    if let Some(ab) = &snapshot.ahead_behind {
        output::hr();
        output::detail(&format!(
            "  {} to push, {} to pull",
            ab.ahead_count(),
            ab.behind_count()
        ));
    }
}

fn format_row(snapshot: &HistorySnapshot, commit: &CommitCharacteristics) -> String {
    let marker = output::commit_marker(
        &commit.commit_id,
        snapshot.head_commit.as_deref(),
        snapshot.ahead_behind.as_ref(),
    );
    format!(
        "{marker} {} {} {} {}",
        commit.abbreviated_id.yellow(),
        commit.date.format("%d %b %Y %H:%M").to_string().dimmed(),
        commit.author_display().cyan(),
        commit.summary()
    )
}
