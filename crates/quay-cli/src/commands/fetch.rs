//! `quay fetch` command - Update remote-tracking refs.

use anyhow::Result;

use crate::commands::utils;
use crate::output;

/// Run the fetch command. A failed fetch is a warning, not an error.
pub fn run(assume_yes: bool) -> Result<()> {
    let session = utils::open_session(assume_yes)?;
    if utils::wait(session.dispatcher.fetch()?, "fetch")? {
        output::success("Fetched");
    } else {
        output::warn("Fetch failed (run with -v for details)");
    }
    Ok(())
}
