//! Plain-text report.
//!
//! ```text
//! Files with hash 8d9ace9df01c0c0876a95c3f810e7e9a and length 23:
//!    /data/a.txt
//!    /data/b.txt
//!
//! 1 duplicate group, 1 redundant file, 23 B reclaimable (3 files total)
//! ```

use std::io::{self, Write};

use bytesize::ByteSize;

use super::Report;

/// Human-readable report writer.
pub struct TextOutput<'a> {
    report: &'a Report,
}

impl<'a> TextOutput<'a> {
    /// Wrap a report for rendering.
    #[must_use]
    pub fn new(report: &'a Report) -> Self {
        Self { report }
    }

    /// Write the listing and summary.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let report = self.report;
        let files_total = report.analysis.files_total;

        if !report.has_duplicates() {
            writeln!(writer, "No duplicates found, {} files total", files_total)?;
            return Ok(());
        }

        for group in &report.groups {
            writeln!(
                writer,
                "Files with hash {} and length {}:",
                group.key.hash, group.key.length
            )?;
            for path in group.paths() {
                writeln!(writer, "   {}", path)?;
            }
            writeln!(writer)?;
        }

        let groups = report.groups.len();
        let redundant = report.duplicate_files();
        writeln!(
            writer,
            "{} duplicate group{}, {} redundant file{}, {} reclaimable ({} files total)",
            groups,
            plural(groups),
            redundant,
            plural(redundant),
            ByteSize::b(report.reclaimable_bytes()),
            files_total
        )?;

        let failed = report.scan.stats.failed;
        if failed > 0 {
            writeln!(
                writer,
                "{} file{} could not be read and {} not included",
                failed,
                plural(failed as usize),
                if failed == 1 { "was" } else { "were" }
            )?;
        }
        Ok(())
    }

    /// Render to a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        // Writing to a Vec cannot fail.
        let _ = self.write_to(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
