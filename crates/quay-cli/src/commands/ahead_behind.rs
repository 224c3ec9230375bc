//! `quay ahead-behind` command - Compare a branch with its upstream.

use anyhow::Result;
use serde::Serialize;

use crate::commands::utils;
use crate::output;

#[derive(Serialize)]
struct Counts<'a> {
    branch: Option<&'a str>,
    upstream: bool,
    ahead: Vec<String>,
    behind: Vec<String>,
}

/// Run the ahead-behind command.
pub fn run(branch: Option<&str>, json: bool, assume_yes: bool) -> Result<()> {
    let session = utils::open_session(assume_yes)?;
    let pending = match branch {
        Some(name) => session
            .dispatcher
            .commits_ahead_and_behind(&format!("refs/heads/{name}"))?,
        None => session.dispatcher.current_ahead_and_behind()?,
    };
    let result = utils::wait(pending, "compare with the upstream")?;

    if json {
        let counts = match result {
            Some(ab) => Counts {
                branch,
                upstream: true,
                ahead: ab.ahead,
                behind: ab.behind,
            },
            None => Counts {
                branch,
                upstream: false,
                ahead: Vec::new(),
                behind: Vec::new(),
            },
        };
        output::essential(&serde_json::to_string_pretty(&counts)?);
        return Ok(());
    }

    match result {
        None => output::warn("No upstream to compare with"),
        Some(ab) if ab.is_in_sync() => output::success("In sync with upstream"),
        Some(ab) => output::essential(&format!(
            "{} ahead, {} behind",
            ab.ahead_count(),
            ab.behind_count()
        )),
    }
    Ok(())
}
