//! Root CLI structure for comsat

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "comsat")]
#[command(about = "Extract StarCraft II replays and maps", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract every file of a replay, plus its user data as replay.header
    ExtractReplay {
        /// Path to the .SC2Replay file
        replay: PathBuf,

        /// Output directory (default: <replay>-extracted next to the replay)
        output: Option<PathBuf>,

        /// Write all files directly into the output directory
        #[arg(long)]
        flatten: bool,

        /// Keep files that already exist in the output directory
        #[arg(long)]
        no_overwrite: bool,
    },

    /// Extract a map's thumbnail and localized GameStrings.txt files
    ExtractMap {
        /// Path to the .SC2Map / .s2ma file
        map: PathBuf,

        /// Name of the thumbnail inside the map
        thumbnail: Option<String>,

        /// Output directory (default: <map>-extracted next to the map)
        output: Option<PathBuf>,

        /// Write all files directly into the output directory
        #[arg(long)]
        flatten: bool,

        /// Keep files that already exist in the output directory
        #[arg(long)]
        no_overwrite: bool,
    },

    /// List files in an archive
    List {
        /// Path to the archive
        archive: PathBuf,

        /// Show detailed information (size, compression ratio, flags)
        #[arg(short, long)]
        long: bool,

        /// Filter files by pattern (supports wildcards)
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Show information about an archive
    Info {
        /// Path to the archive
        archive: PathBuf,
    },
}
