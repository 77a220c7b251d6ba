use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use filetime::FileTime;
use serde::Deserialize;
use std::io::Write;
use std::time::Duration;

use super::types::{FixOutcome, MailFileInfo, format_utc};

/// Files whose mtime is further than this from the header date get reported
pub const DEFAULT_THRESHOLD: Duration = Duration::from_secs(60 * 60);

/// Access time handling when the mtime is rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTimePolicy {
    /// Set atime to the zero time (Unix epoch)
    #[default]
    Reset,
    /// Leave atime untouched
    Preserve,
}

/// Compares header and filesystem times, reports mismatches and optionally
/// rewrites the mtime.
#[derive(Debug, Clone)]
pub struct Fixer {
    pub threshold: Duration,
    /// Rewrite mtimes instead of only reporting
    pub apply: bool,
    pub access_time: AccessTimePolicy,
}

impl Default for Fixer {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            apply: false,
            access_time: AccessTimePolicy::Reset,
        }
    }
}

impl Fixer {
    pub fn is_mismatch(&self, info: &MailFileInfo) -> bool {
        // A threshold too large for chrono can never be exceeded
        match chrono::Duration::from_std(self.threshold) {
            Ok(threshold) => info.abs_diff() > threshold,
            Err(_) => false,
        }
    }

    /// Report `info` to `out` if it is out of sync and fix it when enabled.
    pub fn check<W: Write>(&self, info: &MailFileInfo, out: &mut W) -> Result<FixOutcome> {
        if !self.is_mismatch(info) {
            return Ok(FixOutcome::InSync);
        }

        writeln!(
            out,
            "{} -> {}\t{}",
            format_utc(&info.fs_time),
            format_utc(&info.mail_time),
            info.path.display()
        )?;

        if !self.apply {
            return Ok(FixOutcome::Reported);
        }

        self.set_fs_time(info)?;
        tracing::debug!(path = %info.path.display(), mtime = %info.mail_time, "mtime rewritten");
        Ok(FixOutcome::Fixed)
    }

    fn set_fs_time(&self, info: &MailFileInfo) -> Result<()> {
        let mtime = to_file_time(&info.mail_time);
        match self.access_time {
            AccessTimePolicy::Reset => filetime::set_file_times(&info.path, FileTime::zero(), mtime),
            AccessTimePolicy::Preserve => filetime::set_file_mtime(&info.path, mtime),
        }
        .context("set mtime")
    }
}

fn to_file_time(t: &DateTime<Utc>) -> FileTime {
    FileTime::from_unix_time(t.timestamp(), t.timestamp_subsec_nanos())
}
