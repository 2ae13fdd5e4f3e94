//! Classification of what changed upstream since the last sync.

use serde::{Deserialize, Serialize};

use crate::git::GitRunner;
use crate::repo::{Repository, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
}

impl ChangeKind {
    /// Map a `--name-status` letter. Anything that is not `A` or `D`
    /// (modifications, type changes, renames, copies) counts as modified.
    pub fn from_status(status: &str) -> Self {
        match status {
            "A" => ChangeKind::Added,
            "D" => ChangeKind::Deleted,
            _ => ChangeKind::Modified,
        }
    }
}

/// One path that differs between the local branch tip and `origin/<branch>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteChange {
    pub kind: ChangeKind,
    pub path: String,
}

/// All upstream changes of one sync round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamChanges {
    changes: Vec<RemoteChange>,
}

impl UpstreamChanges {
    pub fn new(changes: Vec<RemoteChange>) -> Self {
        Self { changes }
    }

    pub fn all(&self) -> &[RemoteChange] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Paths that exist upstream but not in the local branch tip.
    pub fn added(&self) -> impl Iterator<Item = &str> {
        self.of_kind(ChangeKind::Added)
    }

    /// Paths the publisher removed.
    pub fn deleted(&self) -> impl Iterator<Item = &str> {
        self.of_kind(ChangeKind::Deleted)
    }

    pub fn is_deleted(&self, path: &str) -> bool {
        self.deleted().any(|p| p == path)
    }

    fn of_kind(&self, kind: ChangeKind) -> impl Iterator<Item = &str> {
        self.changes
            .iter()
            .filter(move |c| c.kind == kind)
            .map(|c| c.path.as_str())
    }
}

/// Parse `git diff --name-status -z` output.
///
/// Records are NUL-separated: a status field followed by the path, verbatim
/// (no C-quoting of spaces or non-ASCII bytes). Rename and copy records carry
/// two paths; the destination is kept.
pub fn parse_name_status(output: &str) -> UpstreamChanges {
    let mut fields = output.split('\0');
    let mut changes = Vec::new();
    while let Some(status) = fields.next() {
        let status = status.trim();
        if status.is_empty() {
            continue;
        }
        let Some(mut path) = fields.next() else {
            break;
        };
        if status.starts_with('R') || status.starts_with('C') {
            match fields.next() {
                Some(dest) => path = dest,
                None => break,
            }
        }
        if path.is_empty() {
            continue;
        }
        changes.push(RemoteChange {
            kind: ChangeKind::from_status(status),
            path: path.to_string(),
        });
    }
    UpstreamChanges::new(changes)
}

/// Diff the checked-out branch against its remote tracking branch. Renames
/// are reported as a deletion plus an addition.
///
/// The remote must already be fetched.
pub fn classify(repo: &Repository, git: &dyn GitRunner) -> Result<UpstreamChanges> {
    let range = format!("HEAD..{}", repo.remote_branch());
    let output = repo.git(git, &["diff", "--name-status", "--no-renames", "-z", &range])?;
    let changes = parse_name_status(&output);
    tracing::debug!(
        range = %range,
        added = changes.added().count(),
        deleted = changes.deleted().count(),
        total = changes.all().len(),
        "classified upstream changes"
    );
    Ok(changes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
