//! Progress reporting utilities using indicatif.
//!
//! Library components report progress through the [`ProgressCallback`]
//! trait and never touch the terminal themselves. The binary injects
//! [`Progress`], which draws indicatif spinners and bars on stderr.
//!
//! # Phases
//!
//! * [`PHASE_SCAN`]: walking the tree and refreshing records (spinner).
//! * [`PHASE_CLEANUP`]: purging stale records (spinner).
//! * [`PHASE_VERIFY`]: confirming duplicate candidates (bar).

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Directory walk and per-file refresh.
pub const PHASE_SCAN: &str = "scan";
/// Removal of records not confirmed by the current scan.
pub const PHASE_CLEANUP: &str = "cleanup";
/// Exact verification of duplicate candidates.
pub const PHASE_VERIFY: &str = "verify";

/// Progress callback for the scan and analysis phases.
///
/// Implementations must be cheap and thread-safe: the scanner calls
/// [`on_progress`](Self::on_progress) from its worker threads.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - One of the `PHASE_*` names
    /// * `total` - Number of items, or 0 when unknown up front
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Items processed so far in this phase
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    active: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, nothing is drawn.
    ///
    /// # Examples
    ///
    /// ```
    /// use ddet::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            active: Mutex::new(None),
            quiet,
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn replace_active(&self, bar: Option<ProgressBar>) -> Option<ProgressBar> {
        match self.active.lock() {
            Ok(mut active) => std::mem::replace(&mut *active, bar),
            Err(_) => None,
        }
    }

    fn with_active(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(active) = self.active.lock() {
            if let Some(bar) = active.as_ref() {
                f(bar);
            }
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let bar = if phase == PHASE_VERIFY {
            let pb = self.multi.add(ProgressBar::new(total as u64));
            pb.set_style(Self::bar_style());
            pb.set_message("Verifying candidates");
            pb
        } else {
            let pb = self.multi.add(ProgressBar::new_spinner());
            pb.set_style(Self::spinner_style());
            pb.set_message(match phase {
                PHASE_SCAN => "Scanning",
                PHASE_CLEANUP => "Removing stale records",
                other => other,
            }
            .to_string());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        };

        if let Some(previous) = self.replace_active(Some(bar)) {
            previous.finish_and_clear();
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }
        self.with_active(|pb| {
            pb.set_position(current as u64);
            pb.set_message(truncate_path(path, 40));
        });
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.replace_active(None) {
            pb.finish_with_message(match phase {
                PHASE_SCAN => "Scan complete",
                PHASE_CLEANUP => "Cleanup complete",
                PHASE_VERIFY => "Verification complete",
                _ => "Done",
            });
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.with_active(|pb| pb.set_message(message.to_string()));
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name.chars().skip(name_len + 3 - max_len).collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}
