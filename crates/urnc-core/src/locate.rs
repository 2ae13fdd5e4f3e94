//! Resolving which working copy a sync session targets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::git::GitRunner;
use crate::repo::{folder_name_from_url, RepoError, Repository, Result};

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_DEPTH: u32 = 1;

/// Input of one `sync` / `follow` invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    /// URL or path of the published repository. `None` means "the repository
    /// I am standing in".
    pub remote: Option<String>,
    /// Working copy folder. Defaults to the remote's last path segment. With
    /// no remote, the directory discovery starts from (defaults to the
    /// current directory).
    pub target: Option<PathBuf>,
    /// Branch to clone. An existing checkout syncs its checked-out branch.
    pub branch: String,
    /// History depth for the initial clone.
    pub depth: u32,
}

impl Default for SyncRequest {
    fn default() -> Self {
        Self {
            remote: None,
            target: None,
            branch: DEFAULT_BRANCH.to_string(),
            depth: DEFAULT_DEPTH,
        }
    }
}

impl SyncRequest {
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: Some(remote.into()),
            ..Self::default()
        }
    }

    pub fn target(mut self, target: impl Into<PathBuf>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// The folder this request resolves to when a remote is given.
    pub fn target_folder(&self) -> Option<PathBuf> {
        match (&self.target, &self.remote) {
            (Some(target), _) => Some(target.clone()),
            (None, Some(remote)) => Some(PathBuf::from(folder_name_from_url(remote))),
            (None, None) => None,
        }
    }
}

/// Result of locating the working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    /// An existing checkout that needs synchronising.
    Existing(Repository),
    /// A fresh clone was made; it is synchronised by definition.
    Cloned(PathBuf),
}

/// Open, clone, or refuse the working copy described by `request`.
pub fn locate(request: &SyncRequest, git: &dyn GitRunner) -> Result<Located> {
    let Some(remote) = request.remote.as_deref() else {
        let start = match &request.target {
            Some(target) => target.clone(),
            None => std::env::current_dir()?,
        };
        return Repository::discover(&start, git)
            .map(Located::Existing)
            .map_err(|_| RepoError::NotFound(start.display().to_string()));
    };

    let folder = request
        .target_folder()
        .unwrap_or_else(|| PathBuf::from(folder_name_from_url(remote)));

    if !folder.exists() {
        info!(folder = %folder.display(), remote, "folder does not exist, cloning");
        clone(remote, &folder, Some(&request.branch), Some(request.depth), git)?;
        return Ok(Located::Cloned(folder));
    }

    open_matching(remote, &folder, git).map(Located::Existing)
}

/// Open `folder` and require its `origin` to be exactly `remote`.
pub fn open_matching(remote: &str, folder: &Path, git: &dyn GitRunner) -> Result<Repository> {
    let repo = match Repository::open(folder, git) {
        Ok(repo) => repo,
        Err(RepoError::DetachedHead(path)) => return Err(RepoError::DetachedHead(path)),
        Err(_) => return Err(RepoError::NotARepo(folder.display().to_string())),
    };

    let actual = repo.origin_url(git)?;
    if actual.as_deref() != Some(remote) {
        return Err(RepoError::RemoteMismatch {
            folder: folder.display().to_string(),
            expected: remote.to_string(),
            actual: actual.unwrap_or_else(|| "<no origin>".to_string()),
        });
    }
    Ok(repo)
}

/// `git clone [--depth N] [--branch B] <remote> <folder>`, run from the
/// current directory with `folder` as given.
pub fn clone(
    remote: &str,
    folder: &Path,
    branch: Option<&str>,
    depth: Option<u32>,
    git: &dyn GitRunner,
) -> Result<()> {
    if let Some(parent) = folder.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    // Run from the caller's directory so a relative remote resolves the
    // same way it would on the command line.
    let cwd = std::env::current_dir()?;
    let folder_arg = folder.to_string_lossy();

    let depth = depth.map(|d| d.to_string());
    let mut args = vec!["clone"];
    if let Some(depth) = depth.as_deref() {
        args.extend(["--depth", depth]);
    }
    if let Some(branch) = branch {
        args.extend(["--branch", branch]);
    }
    args.extend(["--", remote, folder_arg.as_ref()]);

    let output = git.run_git(&cwd, &args)?;
    if !output.success {
        return Err(RepoError::CloneFailed {
            url: remote.to_string(),
            message: output.failure_text(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
