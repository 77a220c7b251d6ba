use chrono::{DateTime, Duration, Utc};
use std::path::PathBuf;

/// A message file paired with its filesystem and header timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct MailFileInfo {
    pub path: PathBuf,
    pub fs_time: DateTime<Utc>,
    pub mail_time: DateTime<Utc>,
}

impl MailFileInfo {
    pub fn abs_diff(&self) -> Duration {
        (self.mail_time - self.fs_time).abs()
    }
}

/// Counts for a single walk over one root
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub visited: usize,
    pub failed: usize,
}

/// Result of comparing one file's timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixOutcome {
    InSync,
    Reported,
    Fixed,
}

/// Aggregated results for one maildir root
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RootReport {
    pub visited: usize,
    pub failed: usize,
    pub mismatched: usize,
    pub fixed: usize,
}

/// Render a UTC time like `2024-01-01 08:00:00.5 +0000 UTC`.
///
/// The fraction is only printed when non-zero, with trailing zeros trimmed.
pub fn format_utc(t: &DateTime<Utc>) -> String {
    let mut out = t.format("%Y-%m-%d %H:%M:%S").to_string();

    let nanos = t.timestamp_subsec_nanos();
    if nanos != 0 {
        let frac = format!("{:09}", nanos);
        out.push('.');
        out.push_str(frac.trim_end_matches('0'));
    }

    out.push_str(" +0000 UTC");
    out
}
