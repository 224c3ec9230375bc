//! CLI command definitions and handlers.

use clap::{ArgAction, Parser, Subcommand};
use clap_complete::Shell;

pub mod ahead_behind;
pub mod completions;
pub mod fetch;
pub mod history;
pub mod mutate;
pub mod show;
pub mod status;
pub mod utils;

/// Quay - serialized staging, conflict resolution and file history for git.
#[derive(Parser)]
#[command(name = "quay")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log output (-v debug, -vv trace). `RUST_LOG` overrides this.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress informational output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Answer every confirmation with "Yes".
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show staged and unstaged changes.
    #[command(alias = "st")]
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Stage files.
    Stage {
        /// Paths to stage.
        #[arg(required_unless_present = "all")]
        paths: Vec<String>,

        /// Stage every unstaged change.
        #[arg(short, long, conflicts_with = "paths")]
        all: bool,
    },

    /// Unstage files.
    Unstage {
        /// Paths to unstage.
        #[arg(required_unless_present = "all")]
        paths: Vec<String>,

        /// Unstage everything.
        #[arg(short, long, conflicts_with = "paths")]
        all: bool,
    },

    /// Throw away local changes to files.
    Discard {
        /// Paths to discard.
        #[arg(required_unless_present = "all")]
        paths: Vec<String>,

        /// Discard every change.
        #[arg(short, long, conflicts_with = "paths")]
        all: bool,
    },

    /// Resolve conflicts by keeping one side.
    ///
    /// During a rebase the sides are reversed; quay asks before going ahead.
    Resolve {
        /// Conflicted paths. Defaults to every conflict.
        paths: Vec<String>,

        /// Keep the local version.
        #[arg(long, conflicts_with = "theirs", required_unless_present = "theirs")]
        mine: bool,

        /// Take the incoming version.
        #[arg(long)]
        theirs: bool,
    },

    /// Show the commits touching a path, or the whole repository.
    #[command(alias = "log")]
    History {
        /// Path to follow (renames included).
        path: Option<String>,

        /// Show at most this many commits.
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Don't fetch before loading.
        #[arg(long)]
        no_fetch: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the files a commit changed.
    Show {
        /// Commit id or revision.
        commit: String,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Compare a branch with its upstream.
    AheadBehind {
        /// Branch to compare. Defaults to the current branch.
        branch: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Fetch the current branch's remote.
    Fetch,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}
