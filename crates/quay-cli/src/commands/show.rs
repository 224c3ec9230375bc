//! `quay show` command - List the files one commit changed.

use anyhow::Result;

use crate::commands::utils;
use crate::output;

/// Run the show command.
pub fn run(commit: &str, json: bool, assume_yes: bool) -> Result<()> {
    let session = utils::open_session(assume_yes)?;
    let files = utils::wait(
        session.dispatcher.changed_files(commit)?,
        &format!("list the files changed by {commit}"),
    )?;

    if json {
        output::essential(&serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    if files.is_empty() {
        output::info("No file changes");
        return Ok(());
    }
    for file in &files {
        output::essential(&format!(
            "{} {}",
            output::change_marker(file.change_type, true),
            file.path
        ));
    }
    Ok(())
}
