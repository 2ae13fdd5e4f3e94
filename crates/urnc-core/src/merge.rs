//! Merging the remote branch with local content winning overlapping hunks.

use serde::{Deserialize, Serialize};

use crate::git::GitRunner;
use crate::repo::{RepoError, Repository, Result};
use crate::snapshot::commit_all;

pub const MODIFY_DELETE_MESSAGE: &str = "Resolve CONFLICT (modify/delete)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Both sides changed the same hunk (`UU`) or added the same path (`AA`).
    Content,
    /// One side modified a file the other side deleted (`UD`, `DU`).
    ModifyDelete,
    /// Any other unmerged state (`DD`, `AU`, `UA`).
    Unknown,
}

impl ConflictKind {
    /// Classify the two-letter `XY` code of a porcelain status line.
    /// Returns `None` for codes that are not unmerged states.
    pub fn from_porcelain(xy: &str) -> Option<Self> {
        match xy {
            "UU" | "AA" => Some(ConflictKind::Content),
            "UD" | "DU" => Some(ConflictKind::ModifyDelete),
            "DD" | "AU" | "UA" => Some(ConflictKind::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub path: String,
    pub kind: ConflictKind,
}

/// Parse `git status --porcelain -z` output into the unmerged entries it
/// lists.
///
/// Each record is `XY <path>` terminated by NUL, with the path unquoted.
/// Rename and copy records are followed by one more record holding the
/// original path.
pub fn parse_conflicts(status: &str) -> Vec<Conflict> {
    let mut records = status.split('\0');
    let mut conflicts = Vec::new();
    while let Some(record) = records.next() {
        let (Some(xy), Some(path)) = (record.get(..2), record.get(3..)) else {
            continue;
        };
        if xy.contains('R') || xy.contains('C') {
            records.next();
        }
        if path.is_empty() {
            continue;
        }
        if let Some(kind) = ConflictKind::from_porcelain(xy) {
            conflicts.push(Conflict {
                path: path.to_string(),
                kind,
            });
        }
    }
    conflicts
}

/// How the merge step ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// Merged (or already up to date).
    Merged,
    /// Modify/delete conflicts were settled by committing the local files.
    ModifyDeleteResolved { paths: Vec<String> },
    /// The merge stopped and could not be settled automatically. The
    /// repository is left in the state `git merge` left it in.
    Unresolved {
        conflicts: Vec<Conflict>,
        message: String,
    },
}

/// `git merge -Xours origin/<branch>`, then settle modify/delete conflicts.
pub fn merge_remote(repo: &Repository, git: &dyn GitRunner) -> Result<MergeOutcome> {
    let remote_branch = repo.remote_branch();
    let output = repo.git_output(git, &["merge", "--no-edit", "-Xours", &remote_branch])?;
    if output.success {
        return Ok(MergeOutcome::Merged);
    }

    let message = output.failure_text();
    let status = repo.git(git, &["status", "--porcelain", "-z"])?;
    let conflicts = parse_conflicts(&status);

    let only_modify_delete = !conflicts.is_empty()
        && conflicts
            .iter()
            .all(|c| c.kind == ConflictKind::ModifyDelete);
    if !only_modify_delete {
        return Ok(MergeOutcome::Unresolved { conflicts, message });
    }

    commit_all(repo, git, MODIFY_DELETE_MESSAGE)?;
    Ok(MergeOutcome::ModifyDeleteResolved {
        paths: conflicts.into_iter().map(|c| c.path).collect(),
    })
}

/// Commits only on the local side and only on the remote side, from
/// `git rev-list --left-right --count HEAD...origin/<branch>`.
pub fn ahead_behind(repo: &Repository, git: &dyn GitRunner) -> Result<(u64, u64)> {
    let range = format!("HEAD...{}", repo.remote_branch());
    let output = repo.git(git, &["rev-list", "--left-right", "--count", &range])?;
    let mut counts = output.split_whitespace().map(str::parse::<u64>);
    match (counts.next(), counts.next()) {
        (Some(Ok(ahead)), Some(Ok(behind))) => Ok((ahead, behind)),
        _ => Err(RepoError::GitCommand(format!(
            "git rev-list --left-right --count {range}: unexpected output {:?}",
            output.trim()
        ))),
    }
}

/// `git pull --ff-only` for the follow mode.
///
/// Divergence is detected up front and reported as
/// [`RepoError::Diverged`]; any failure of the pull itself stays a
/// [`RepoError::GitCommand`].
pub fn fast_forward(repo: &Repository, git: &dyn GitRunner) -> Result<()> {
    let (ahead, behind) = ahead_behind(repo, git)?;
    if ahead > 0 && behind > 0 {
        return Err(RepoError::Diverged {
            branch: repo.branch().to_string(),
            ahead,
            behind,
        });
    }
    repo.git(git, &["pull", "--ff-only"])?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
