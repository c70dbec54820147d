//! Main entry point for the comsat CLI

use anyhow::Result;
use clap::Parser;

use comsat::cli::{Cli, Commands};
use comsat::commands;

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logger, verbosity flags override the default level
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    // Execute command
    match cli.command {
        Commands::ExtractReplay {
            replay,
            output,
            flatten,
            no_overwrite,
        } => commands::extract::extract_replay(
            &replay,
            output.as_deref(),
            &commands::extract::extract_options(flatten, no_overwrite),
        ),
        Commands::ExtractMap {
            map,
            thumbnail,
            output,
            flatten,
            no_overwrite,
        } => commands::extract::extract_map(
            &map,
            thumbnail.as_deref(),
            output.as_deref(),
            &commands::extract::extract_options(flatten, no_overwrite),
        ),
        Commands::List {
            archive,
            long,
            filter,
        } => commands::mpq::list_archive(&archive, long, filter.as_deref()),
        Commands::Info { archive } => commands::mpq::show_info(&archive),
    }
}
