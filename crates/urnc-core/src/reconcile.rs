//! Restoring tracked files the consumer deleted without committing.

use serde::{Deserialize, Serialize};

use crate::changes::UpstreamChanges;
use crate::git::{nul_separated, GitRunner};
use crate::repo::{Repository, Result};

/// Where a locally deleted file was restored from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreSource {
    /// The last local commit. Used when upstream deleted the file too, so
    /// that the merge applies the deletion on both sides.
    Head,
    /// The remote branch tip. The local deletion is discarded.
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restored {
    pub path: String,
    pub source: RestoreSource,
}

/// Tracked paths that are missing from the working tree
/// (`git ls-files --deleted -z`, so paths arrive unquoted).
pub fn locally_deleted(repo: &Repository, git: &dyn GitRunner) -> Result<Vec<String>> {
    let output = repo.git(git, &["ls-files", "--deleted", "-z"])?;
    let mut paths = nul_separated(&output);
    // A path deleted in both index and worktree can be listed twice.
    paths.dedup();
    Ok(paths)
}

/// Check every locally deleted file back out, from `HEAD` if upstream deleted
/// it as well, from `origin/<branch>` otherwise.
///
/// Does not unstage; call [`unstage_all`] afterwards.
pub fn restore_deleted(
    repo: &Repository,
    git: &dyn GitRunner,
    changes: &UpstreamChanges,
) -> Result<Vec<Restored>> {
    let remote_branch = repo.remote_branch();
    let mut restored = Vec::new();

    for path in locally_deleted(repo, git)? {
        let source = if changes.is_deleted(&path) {
            RestoreSource::Head
        } else {
            RestoreSource::Remote
        };
        let rev = match source {
            RestoreSource::Head => "HEAD",
            RestoreSource::Remote => remote_branch.as_str(),
        };
        repo.git(git, &["checkout", rev, "--", &path])?;
        restored.push(Restored { path, source });
    }

    Ok(restored)
}

/// `git reset --mixed`: drop everything the checkouts staged, keep the
/// working tree.
pub fn unstage_all(repo: &Repository, git: &dyn GitRunner) -> Result<()> {
    repo.git(git, &["reset", "--mixed", "--quiet"])?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::parse_name_status;
    use crate::git::mock::MockGitRunner;
    use crate::git::GitOutput;

    fn repo() -> Repository {
        Repository::new("/r/.git", "/r", "main")
    }

    #[test]
    fn restores_from_remote_unless_deleted_upstream() {
        let git = MockGitRunner::new().on(
            &["ls-files"],
            GitOutput::ok("example.ipynb\0tmp2.txt\0"),
        );
        let changes = parse_name_status("D\0tmp2.txt\0M\0example.ipynb\0");

        let restored = restore_deleted(&repo(), &git, &changes).unwrap();

        assert_eq!(
            restored,
            vec![
                Restored {
                    path: "example.ipynb".into(),
                    source: RestoreSource::Remote
                },
                Restored {
                    path: "tmp2.txt".into(),
                    source: RestoreSource::Head
                },
            ]
        );
        assert_eq!(
            git.command_lines(),
            vec![
                "ls-files --deleted -z",
                "checkout origin/main -- example.ipynb",
                "checkout HEAD -- tmp2.txt",
            ]
        );
    }

    #[test]
    fn nothing_deleted_runs_no_checkout() {
        let git = MockGitRunner::new().on(&["ls-files"], GitOutput::ok(""));
        let restored = restore_deleted(&repo(), &git, &UpstreamChanges::default()).unwrap();
        assert!(restored.is_empty());
        assert_eq!(git.commands().len(), 1);
    }

    #[test]
    fn failed_checkout_propagates() {
        let git = MockGitRunner::new()
            .on(&["ls-files"], GitOutput::ok("gone.txt\0"))
            .on(
                &["checkout"],
                GitOutput::failed("error: pathspec 'gone.txt' did not match"),
            );
        let err = restore_deleted(&repo(), &git, &UpstreamChanges::default()).unwrap_err();
        assert!(err.to_string().contains("did not match"));
    }

    #[test]
    fn duplicate_listing_is_collapsed() {
        let git = MockGitRunner::new().on(&["ls-files"], GitOutput::ok("a.txt\0a.txt\0"));
        assert_eq!(locally_deleted(&repo(), &git).unwrap(), vec!["a.txt"]);
    }

    #[test]
    fn non_ascii_path_is_checked_out_verbatim() {
        let git = MockGitRunner::new().on(&["ls-files"], GitOutput::ok("\u{fc}bung.txt\0"));
        let restored = restore_deleted(&repo(), &git, &UpstreamChanges::default()).unwrap();
        assert_eq!(restored[0].path, "übung.txt");
        assert_eq!(git.command_lines()[1], "checkout origin/main -- übung.txt");
    }

    #[test]
    fn unstage_is_mixed_reset() {
        let git = MockGitRunner::new();
        unstage_all(&repo(), &git).unwrap();
        assert_eq!(git.command_lines(), vec!["reset --mixed --quiet"]);
    }
}
