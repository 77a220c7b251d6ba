use anyhow::Result;
use std::ffi::OsStr;
use std::fs::Metadata;
use std::io::Write;
use std::path::Path;
use walkdir::WalkDir;

use super::types::WalkSummary;

/// Maildir subdirectory holding seen messages
const CUR_DIR: &str = "cur";

/// What the walker does when handling a single file fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileErrorPolicy {
    /// Write `error: <message> [<path>]` to the error stream and move on
    #[default]
    LogAndContinue,
    /// Stop the walk and return the error to the caller
    Abort,
}

impl FileErrorPolicy {
    /// Apply the policy to the result of handling `path`.
    /// Returns `Ok(true)` if the file failed but the walk should go on.
    fn handle<E: Write>(self, path: &Path, result: Result<()>, errors: &mut E) -> Result<bool> {
        match (self, result) {
            (_, Ok(())) => Ok(false),
            (FileErrorPolicy::LogAndContinue, Err(e)) => {
                writeln!(errors, "error: {:#} [{}]", e, path.display())?;
                Ok(true)
            }
            (FileErrorPolicy::Abort, Err(e)) => {
                Err(e.context(format!("failed on {}", path.display())))
            }
        }
    }
}

/// True if the file sits directly inside a directory named `cur`
fn in_cur_dir(path: &Path) -> bool {
    path.parent().and_then(|p| p.file_name()) == Some(OsStr::new(CUR_DIR))
}

/// Recursively walk `root` in file name order, calling `visit` for every
/// regular file whose parent directory is `cur`.
///
/// Traversal errors abort the walk. Errors from `visit` (and from reading a
/// candidate's metadata) go through `policy`, which logs to `errors`.
pub fn walk_maildir_cur<E, F>(
    root: &Path,
    policy: FileErrorPolicy,
    errors: &mut E,
    mut visit: F,
) -> Result<WalkSummary>
where
    E: Write,
    F: FnMut(&Path, &Metadata) -> Result<()>,
{
    let mut summary = WalkSummary::default();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;

        // Symlinks are not followed, so they show up here as non-files
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !in_cur_dir(path) {
            tracing::trace!(path = %path.display(), "skipping file outside cur");
            continue;
        }

        summary.visited += 1;
        tracing::debug!(path = %path.display(), "visiting");

        let result = entry
            .metadata()
            .map_err(anyhow::Error::from)
            .and_then(|metadata| visit(path, &metadata));

        if policy.handle(path, result, errors)? {
            summary.failed += 1;
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io;
    use std::path::PathBuf;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"Date: Mon, 01 Jan 2024 10:00:00 +0000\n\nbody\n").unwrap();
    }

    fn collect(root: &Path) -> Vec<PathBuf> {
        let mut seen = Vec::new();
        walk_maildir_cur(root, FileErrorPolicy::LogAndContinue, &mut io::sink(), |path, _| {
            seen.push(path.to_path_buf());
            Ok(())
        })
        .unwrap();
        seen
    }

    #[test]
    fn test_in_cur_dir() {
        assert!(in_cur_dir(Path::new("/mail/Inbox/cur/1:2,S")));
        assert!(!in_cur_dir(Path::new("/mail/Inbox/new/1")));
        assert!(!in_cur_dir(Path::new("/mail/Inbox/Cur/1")));
        assert!(!in_cur_dir(Path::new("/mail/cur/sub/1")));
        assert!(!in_cur_dir(Path::new("cur")));
    }

    #[test]
    fn test_only_cur_files_are_visited() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("Inbox/cur/a"));
        touch(&root.join("Inbox/new/b"));
        touch(&root.join("Inbox/tmp/c"));
        touch(&root.join("Inbox/cur/nested/e"));
        touch(&root.join(".Sent/cur/f"));
        touch(&root.join("cur.bak/g"));

        assert_eq!(
            collect(root),
            vec![root.join(".Sent/cur/f"), root.join("Inbox/cur/a")]
        );
    }

    #[test]
    fn test_visits_in_file_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let names = ["m", "c", "x", "a", "q", "b", "z", "d"];
        for name in names {
            touch(&root.join("Inbox/cur").join(name));
        }

        let mut sorted = names.to_vec();
        sorted.sort();
        let expected: Vec<PathBuf> = sorted.iter().map(|n| root.join("Inbox/cur").join(n)).collect();
        assert_eq!(collect(root), expected);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_and_dirs_in_cur_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let real = root.join("Inbox/cur/real");
        touch(&real);
        fs::create_dir_all(root.join("Inbox/cur/subdir")).unwrap();
        std::os::unix::fs::symlink(&real, root.join("Inbox/cur/link")).unwrap();

        assert_eq!(collect(root), vec![real]);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = walk_maildir_cur(
            &dir.path().join("does-not-exist"),
            FileErrorPolicy::LogAndContinue,
            &mut io::sink(),
            |_, _| Ok(()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_log_and_continue_keeps_walking() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for name in ["a", "b", "c"] {
            touch(&root.join("Inbox/cur").join(name));
        }

        let mut calls = 0;
        let mut errors = Vec::new();
        let summary = walk_maildir_cur(root, FileErrorPolicy::LogAndContinue, &mut errors, |path, _| {
            calls += 1;
            if path.ends_with("b") {
                anyhow::bail!("boom");
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(calls, 3);
        assert_eq!(summary, WalkSummary { visited: 3, failed: 1 });
        assert_eq!(
            String::from_utf8(errors).unwrap(),
            format!("error: boom [{}]\n", root.join("Inbox/cur/b").display())
        );
    }

    #[test]
    fn test_abort_policy_stops_walk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for name in ["a", "b", "c"] {
            touch(&root.join("Inbox/cur").join(name));
        }

        let mut calls = 0;
        let mut errors = Vec::new();
        let result = walk_maildir_cur(root, FileErrorPolicy::Abort, &mut errors, |_, _| {
            calls += 1;
            anyhow::bail!("boom")
        });

        assert!(result.is_err());
        assert_eq!(calls, 1);
        assert!(errors.is_empty());
    }
}
