//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Voice channel attendance logger.
///
/// Records when participants join and leave tracked voice channels and
/// reports each participant's total connected time when logging stops.
#[derive(Debug, Parser)]
#[command(name = "vlog", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Process a JSONL feed of presence changes and logger commands.
    Run {
        /// Feed file to replay. Reads stdin when omitted.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Directory reports are written to (overrides `report_dir`).
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Format a duration in milliseconds as H:MM:SS.
    FormatDuration {
        /// Duration in milliseconds.
        #[arg(allow_negative_numbers = true)]
        ms: i64,
    },
}
