//! `quay stage|unstage|discard|resolve` commands - Change the index and
//! working tree through the dispatcher.

use anyhow::{Result, bail};
use quay_core::{Action, DispatchOutcome};
use quay_git::{FileStatus, WorkingCopyStatus};

use crate::commands::utils;
use crate::output;

/// Run a mutating command on `paths` (or every candidate with `all`).
pub fn run(action: Action, paths: &[String], all: bool, assume_yes: bool) -> Result<()> {
    let session = utils::open_session(assume_yes)?;
    let status = session.status()?;

    let files = if all || (action.is_resolution() && paths.is_empty()) {
        candidates(&status, action, all || paths.is_empty())
    } else {
        session.select(&candidates(&status, action, false), paths)?
    };

    if files.is_empty() {
        output::info(&format!("Nothing to {}", action.label()));
        return Ok(());
    }

    let count = files.len();
    match session.dispatcher.dispatch(files, action)? {
        DispatchOutcome::Declined => {
            output::warn("Cancelled - nothing was changed");
            Ok(())
        }
        DispatchOutcome::Scheduled(pending) => {
            let outcome = utils::wait(pending, action.label())?;
            // Per-path failures were already printed by the notifier.
            if !outcome.is_complete() {
                bail!("{} of {count} path(s) failed", outcome.failed.len());
            }
            output::success(&format!("{} {count} path(s)", past_tense(action)));
            for path in &outcome.succeeded {
                output::detail(&format!("  {path}"));
            }
            Ok(())
        }
    }
}

/// Files the action can apply to.
///
/// Resolutions work on conflicts when no path is named, and on any change
/// otherwise.
fn candidates(status: &WorkingCopyStatus, action: Action, implicit: bool) -> Vec<FileStatus> {
    match action {
        Action::Stage => status.unstaged.clone(),
        Action::Unstage => status.staged.clone(),
        Action::ResolveUsingMine | Action::ResolveUsingTheirs if implicit => {
            status.conflicts().cloned().collect()
        }
        Action::Discard | Action::ResolveUsingMine | Action::ResolveUsingTheirs => {
            let mut files = status.unstaged.clone();
            for staged in &status.staged {
                if !files.iter().any(|file| file.path == staged.path) {
                    files.push(staged.clone());
                }
            }
            files
        }
    }
}

const fn past_tense(action: Action) -> &'static str {
    match action {
        Action::Stage => "Staged",
        Action::Unstage => "Unstaged",
        Action::Discard => "Discarded",
        Action::ResolveUsingMine => "Resolved using mine",
        Action::ResolveUsingTheirs => "Resolved using theirs",
    }
}
