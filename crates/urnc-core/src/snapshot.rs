//! Committer identity and the snapshot commit that precedes every merge.

use serde::{Deserialize, Serialize};

use crate::git::GitRunner;
use crate::repo::{Repository, Result};

pub const SNAPSHOT_MESSAGE: &str = "Automatic commit by urnc";

/// Name and email written to the repository config when none is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            name: "urnc".into(),
            email: "urnc@spang-lab.de".into(),
        }
    }
}

/// Make sure `user.name` and `user.email` are set in the repository's own
/// config. Returns `true` if the identity was written.
///
/// With `force` the identity is written even if one is already present.
pub fn ensure_identity(
    repo: &Repository,
    git: &dyn GitRunner,
    identity: &Identity,
    force: bool,
) -> Result<bool> {
    if !force {
        let name = local_config(repo, git, "user.name")?;
        let email = local_config(repo, git, "user.email")?;
        if name.is_some() && email.is_some() {
            return Ok(false);
        }
    }

    repo.git(git, &["config", "--local", "user.name", &identity.name])?;
    repo.git(git, &["config", "--local", "user.email", &identity.email])?;
    tracing::debug!(name = %identity.name, email = %identity.email, "set committer identity");
    Ok(true)
}

/// Read a key from the repository-level config; `None` if unset.
fn local_config(repo: &Repository, git: &dyn GitRunner, key: &str) -> Result<Option<String>> {
    let output = repo.git_output(git, &["config", "--local", "--get", key])?;
    let value = output.stdout.trim();
    if output.success && !value.is_empty() {
        Ok(Some(value.to_string()))
    } else {
        Ok(None)
    }
}

/// Whether tracked files differ from `HEAD` (index or working tree).
/// Untracked files do not count.
pub fn is_dirty(repo: &Repository, git: &dyn GitRunner) -> Result<bool> {
    let status = repo.git(git, &["status", "--porcelain", "--untracked-files=no"])?;
    Ok(status.lines().any(|l| !l.trim().is_empty()))
}

/// Commit every tracked change with `message`, allowing an empty commit.
pub fn commit_all(repo: &Repository, git: &dyn GitRunner, message: &str) -> Result<()> {
    repo.git(git, &["commit", "-am", message, "--allow-empty"])?;
    Ok(())
}

/// Fold the working tree into one commit if it is dirty. Returns whether a
/// commit was made.
pub fn snapshot(repo: &Repository, git: &dyn GitRunner) -> Result<bool> {
    if !is_dirty(repo, git)? {
        return Ok(false);
    }
    commit_all(repo, git, SNAPSHOT_MESSAGE)?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
