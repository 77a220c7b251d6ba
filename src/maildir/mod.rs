mod fixer;
mod inspect;
mod types;
mod walk;

pub use fixer::{AccessTimePolicy, DEFAULT_THRESHOLD, Fixer};
pub use inspect::inspect;
pub use types::{FixOutcome, MailFileInfo, RootReport, WalkSummary, format_utc};
pub use walk::{FileErrorPolicy, walk_maildir_cur};

use anyhow::Result;
use std::io::Write;
use std::path::Path;

/// Check every message under `root`, writing mismatches to `out` and
/// per-file errors to `errors`.
///
/// Only traversal errors (or per-file errors under `FileErrorPolicy::Abort`)
/// are returned; everything else is counted in the report.
pub fn fix_maildir<W: Write, E: Write>(
    root: &Path,
    fixer: &Fixer,
    policy: FileErrorPolicy,
    out: &mut W,
    errors: &mut E,
) -> Result<RootReport> {
    let mut report = RootReport::default();

    let summary = walk_maildir_cur(root, policy, errors, |path, metadata| {
        let info = inspect(path, metadata)?;
        match fixer.check(&info, out)? {
            FixOutcome::InSync => {}
            FixOutcome::Reported => report.mismatched += 1,
            FixOutcome::Fixed => {
                report.mismatched += 1;
                report.fixed += 1;
            }
        }
        Ok(())
    })?;

    report.visited = summary.visited;
    report.failed = summary.failed;

    tracing::info!(
        root = %root.display(),
        visited = report.visited,
        mismatched = report.mismatched,
        fixed = report.fixed,
        failed = report.failed,
        "maildir checked"
    );

    Ok(report)
}
