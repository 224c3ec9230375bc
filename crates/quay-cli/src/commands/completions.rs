//! `quay completions` command - Print a shell completion script.

use std::io;

use clap::CommandFactory;
use clap_complete::{Shell, generate};

use super::Cli;

/// Write the completion script for `shell` to stdout.
#[allow(clippy::unnecessary_wraps)]
pub fn run(shell: Shell) -> anyhow::Result<()> {
    generate(shell, &mut Cli::command(), "quay", &mut io::stdout());
    Ok(())
}
