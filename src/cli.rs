//! Command-line interface definitions for ddet.
//!
//! # Example
//!
//! ```bash
//! # Scan a directory and list duplicates, reusing stored hashes
//! ddet ~/Photos
//!
//! # Machine-readable report
//! ddet ~/Photos --output json
//!
//! # One-off run that leaves no database behind
//! ddet --no-db /mnt/backup
//!
//! # Verbose mode for debugging
//! ddet -v ~/Photos
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Incremental duplicate file finder.
///
/// ddet records the size, modification time and content hash of every file
/// it scans, so later runs over the same tree only re-hash what changed.
/// Files with identical content and length are reported as duplicates.
#[derive(Debug, Parser)]
#[command(name = "ddet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to scan for duplicates
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to the record database
    ///
    /// If not specified, the configured path or a platform-specific data
    /// directory is used.
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Keep records in memory only; nothing is persisted
    #[arg(long, conflicts_with = "db")]
    pub no_db: bool,

    /// Remove every stored record before scanning
    #[arg(long, conflicts_with = "no_db")]
    pub clear_db: bool,

    /// Number of threads that stat and hash files (default: 4)
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Number of slots in the duplicate candidate filter (default: 5192)
    #[arg(long, value_name = "N")]
    pub filter_slots: Option<usize>,

    /// Filter slots set per key (default: 2)
    #[arg(long, value_name = "N")]
    pub slots_per_entry: Option<usize>,

    /// Configuration file to load instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Print errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,

    /// Disable the progress display
    #[arg(long)]
    pub no_progress: bool,
}

/// Output format for the duplicate report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable listing
    Text,
    /// JSON document for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
