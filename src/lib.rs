//! ddet - Incremental duplicate file detector
//!
//! Scans a directory tree, keeps one record per file (size, modification
//! time, BLAKE3 content hash) in a persistent store, and reports files that
//! share both content hash and length. Later scans of the same tree only
//! re-hash files whose size or modification time changed.
//!
//! # Pipeline
//!
//! 1. [`scanner::Scanner`] brings the [`store::RecordStore`] up to date for
//!    the requested directory and purges records of deleted files.
//! 2. [`duplicates::DuplicateIndex`] streams the directory's records through
//!    a fixed-size [`filter::CompositeFilter`] and verifies the candidates
//!    against the store.
//! 3. [`output`] renders the groups as text or JSON.

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod filter;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod store;

use std::io;
use std::sync::Arc;

use anyhow::Context;

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::duplicates::DuplicateIndex;
use crate::error::ExitCode;
use crate::output::{JsonOutput, Report, TextOutput};
use crate::progress::{Progress, ProgressCallback};
use crate::scanner::Scanner;
use crate::store::{MemoryStore, RecordStore, SqliteStore};

/// Run the application with parsed command-line arguments.
///
/// Scans `cli.path`, analyses it for duplicates, prints the report to
/// stdout, and returns the exit code describing the outcome.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the store cannot be
/// opened, the root cannot be scanned, or the store fails mid-run.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let mut config = Config::load(cli.config.as_deref())?;
    config.merge_cli(&cli);
    config.validate()?;
    log::debug!("Effective configuration: {:?}", config);

    let store = open_store(&cli, &config)?;

    let progress: Option<Arc<dyn ProgressCallback>> = if config.progress {
        Some(Arc::new(Progress::new(false)))
    } else {
        None
    };

    let mut scanner = Scanner::new(Arc::clone(&store), config.scanner_config());
    if let Some(cb) = &progress {
        scanner = scanner.with_progress_callback(Arc::clone(cb));
    }
    let scan = scanner
        .scan(&cli.path)
        .with_context(|| format!("Failed to scan {}", cli.path.display()))?;

    let mut index = DuplicateIndex::new(config.filter_config())?;
    if let Some(cb) = &progress {
        index = index.with_progress_callback(Arc::clone(cb));
    }
    index
        .add_all(store.as_ref(), &scan.prefix)
        .context("Duplicate analysis failed")?;
    let groups = index
        .groups(store.as_ref())
        .context("Failed to read duplicate groups")?;

    let report = Report::new(scan, index.stats(), groups);
    let exit_code = ExitCode::for_outcome(report.has_duplicates(), report.scan.stats.failed);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.output {
        OutputFormat::Text => TextOutput::new(&report)
            .write_to(&mut out)
            .context("Failed to write report")?,
        OutputFormat::Json => JsonOutput::new(&report, exit_code)
            .write_to(&mut out, true)
            .context("Failed to write report")?,
    }

    Ok(exit_code)
}

fn open_store(cli: &Cli, config: &Config) -> anyhow::Result<Arc<dyn RecordStore>> {
    if cli.no_db {
        log::debug!("Using in-memory record store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let path = config.database_path().context(
        "Could not determine a database location; pass --db <PATH> or --no-db",
    )?;
    let store = SqliteStore::open(&path)
        .with_context(|| format!("Failed to open record store {}", path.display()))?;

    if cli.clear_db {
        store.clear().context("Failed to clear record store")?;
    }
    Ok(Arc::new(store))
}
