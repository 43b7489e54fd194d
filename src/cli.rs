mod options;

use clap::{ArgAction, Parser, Subcommand};
pub use options::{ColorMode, OutputFormat, SortBy};
use std::path::PathBuf;

/// Analyze request logs: reconstruct requests and report on them
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Profile file (TOML) with the log format and reports
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Built-in profile to use when no config file is given
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Output format
    #[arg(short = 'F', long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors and hide the progress spinner
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// When to use colors in text output
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the profile's reports over one or more log files
    Analyze {
        /// Log files to analyze; `-` reads standard input
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Files processed in parallel (default: available cores)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Ordering of duration report rows
        #[arg(long, value_enum, default_value_t = SortBy::Sum)]
        sort_by: SortBy,

        /// Rows shown per report in text output
        #[arg(long, default_value_t = 20)]
        top: usize,
    },
    /// Validate the profile and list its line definitions and reports
    Check,
    /// List the built-in profiles
    Profiles,
}

impl Cli {
    /// Level for the log subscriber when RUST_LOG is not set
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

pub fn cli_parse() -> Cli {
    Cli::parse()
}
