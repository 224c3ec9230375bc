//! Quay CLI - serialized staging, conflict resolution and file history for
//! git working copies.

use clap::Parser;
use env_logger::{Builder, Env};
use quay_core::Action;

mod commands;
mod host;
mod output;

use commands::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    output::set_quiet(cli.quiet);
    init_logging(cli.verbose);

    let yes = cli.yes;
    let result = match cli.command {
        Commands::Status { json } => commands::status::run(json, yes),
        Commands::Stage { paths, all } => commands::mutate::run(Action::Stage, &paths, all, yes),
        Commands::Unstage { paths, all } => {
            commands::mutate::run(Action::Unstage, &paths, all, yes)
        }
        Commands::Discard { paths, all } => {
            commands::mutate::run(Action::Discard, &paths, all, yes)
        }
        Commands::Resolve { paths, mine, .. } => {
            let action = if mine {
                Action::ResolveUsingMine
            } else {
                Action::ResolveUsingTheirs
            };
            commands::mutate::run(action, &paths, false, yes)
        }
        Commands::History {
            path,
            limit,
            no_fetch,
            json,
        } => commands::history::run(path.as_deref(), limit, no_fetch, json, yes),
        Commands::Show { commit, json } => commands::show::run(&commit, json, yes),
        Commands::AheadBehind { branch, json } => {
            commands::ahead_behind::run(branch.as_deref(), json, yes)
        }
        Commands::Fetch => commands::fetch::run(yes),
        Commands::Completions { shell } => commands::completions::run(shell),
    };

    if let Err(e) = result {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

/// Log to stderr. `RUST_LOG` wins over the `-v` count.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
