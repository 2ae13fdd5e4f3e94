use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::git::{GitOutput, GitRunner};

/// Name of the only remote the sync engine talks to.
pub const ORIGIN: &str = "origin";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("git command failed: {0}")]
    GitCommand(String),

    /// No repository was found walking up from the given directory.
    #[error("no git repository found at or above {0}")]
    NotFound(String),

    #[error("{0} exists but is not a git repo")]
    NotARepo(String),

    /// The folder is a repository, but its `origin` points somewhere else.
    #[error("remote url {actual} of folder {folder} does not match {expected}")]
    RemoteMismatch {
        folder: String,
        expected: String,
        actual: String,
    },

    #[error("failed to clone {url}: {message}")]
    CloneFailed { url: String, message: String },

    /// Local and remote history both have commits the other lacks.
    #[error("branch {branch} has diverged from origin ({ahead} local, {behind} remote commits); cannot fast-forward")]
    Diverged {
        branch: String,
        ahead: u64,
        behind: u64,
    },

    #[error("HEAD of {0} is detached; a branch must be checked out")]
    DetachedHead(String),

    #[error("path not found: {0}")]
    PathNotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RepoError>;

// ---------------------------------------------------------------------------
// Repository: the one handle a sync session works on
// ---------------------------------------------------------------------------

/// A local working copy: its `.git` directory, its checkout, and the branch
/// that is currently checked out.
///
/// The handle holds paths only. Every git operation takes the
/// [`GitRunner`] explicitly so tests can substitute a mock.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repository {
    gitdir: PathBuf,
    workdir: PathBuf,
    branch: String,
}

impl Repository {
    /// Create a handle with explicit paths (for fixtures and tests).
    pub fn new(
        gitdir: impl Into<PathBuf>,
        workdir: impl Into<PathBuf>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            gitdir: gitdir.into(),
            workdir: workdir.into(),
            branch: branch.into(),
        }
    }

    /// Find the repository containing `start`, walking up parent directories.
    pub fn discover(start: &Path, git: &dyn GitRunner) -> Result<Self> {
        if !start.exists() {
            return Err(RepoError::PathNotFound(start.display().to_string()));
        }

        #[cfg(feature = "libgit2")]
        {
            if let Ok(repo) = crate::git2_ops::Git2ReadOps::discover(start) {
                return Ok(repo);
            }
        }

        let toplevel = git.run_git(start, &["rev-parse", "--show-toplevel"])?;
        if !toplevel.success {
            return Err(RepoError::NotFound(start.display().to_string()));
        }
        Self::from_shell(PathBuf::from(toplevel.stdout.trim()), git)
    }

    /// Open the repository rooted exactly at `path` (no parent search).
    pub fn open(path: &Path, git: &dyn GitRunner) -> Result<Self> {
        if !path.exists() {
            return Err(RepoError::PathNotFound(path.display().to_string()));
        }

        #[cfg(feature = "libgit2")]
        {
            if let Ok(repo) = crate::git2_ops::Git2ReadOps::open(path) {
                return Ok(repo);
            }
        }

        if !path.join(".git").exists() {
            return Err(RepoError::NotARepo(path.display().to_string()));
        }
        Self::from_shell(path.to_path_buf(), git)
    }

    /// Shell-out fallback: resolve gitdir and branch for a known workdir.
    fn from_shell(workdir: PathBuf, git: &dyn GitRunner) -> Result<Self> {
        let gitdir = git.run_git(&workdir, &["rev-parse", "--absolute-git-dir"])?;
        if !gitdir.success {
            return Err(RepoError::NotARepo(workdir.display().to_string()));
        }
        let head = git.run_git(&workdir, &["symbolic-ref", "--short", "HEAD"])?;
        if !head.success {
            return Err(RepoError::DetachedHead(workdir.display().to_string()));
        }

        Ok(Self {
            gitdir: PathBuf::from(gitdir.stdout.trim()),
            workdir,
            branch: head.stdout.trim().to_string(),
        })
    }

    /// The `.git` directory path.
    pub fn gitdir(&self) -> &Path {
        &self.gitdir
    }

    /// The working directory path.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// The checked-out branch.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// The remote tracking ref of the checked-out branch, e.g. `origin/main`.
    pub fn remote_branch(&self) -> String {
        format!("{ORIGIN}/{}", self.branch)
    }

    /// Run a git command in the working directory, turning a non-zero exit
    /// into [`RepoError::GitCommand`]. Returns stdout.
    pub fn git(&self, git: &dyn GitRunner, args: &[&str]) -> Result<String> {
        let output = self.git_output(git, args)?;
        if !output.success {
            return Err(RepoError::GitCommand(format!(
                "git {}: {}",
                args.join(" "),
                output.failure_text()
            )));
        }
        Ok(output.stdout)
    }

    /// Run a git command in the working directory without checking the exit
    /// status.
    pub fn git_output(&self, git: &dyn GitRunner, args: &[&str]) -> Result<GitOutput> {
        Ok(git.run_git(&self.workdir, args)?)
    }

    /// URL of the `origin` remote, or `None` if there is no such remote.
    pub fn origin_url(&self, git: &dyn GitRunner) -> Result<Option<String>> {
        #[cfg(feature = "libgit2")]
        {
            if let Ok(url) = crate::git2_ops::Git2ReadOps::remote_url(&self.workdir, ORIGIN) {
                return Ok(url);
            }
        }

        let output = self.git_output(git, &["remote", "get-url", ORIGIN])?;
        if output.success {
            Ok(Some(output.stdout.trim().to_string()))
        } else {
            Ok(None)
        }
    }

    /// Whether `name` exists as a local branch or as `origin/<name>`.
    pub fn branch_exists(&self, git: &dyn GitRunner, name: &str) -> Result<bool> {
        #[cfg(feature = "libgit2")]
        {
            if let Ok(exists) = crate::git2_ops::Git2ReadOps::branch_exists(&self.workdir, name) {
                return Ok(exists);
            }
        }

        let local = format!("refs/heads/{name}");
        let remote = format!("refs/remotes/{ORIGIN}/{name}");
        for reference in [local, remote] {
            let output =
                self.git_output(git, &["rev-parse", "--quiet", "--verify", &reference])?;
            if output.success {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether the tag `refs/tags/<name>` exists.
    pub fn tag_exists(&self, git: &dyn GitRunner, name: &str) -> Result<bool> {
        let reference = format!("refs/tags/{name}");
        let output = self.git_output(git, &["rev-parse", "--quiet", "--verify", &reference])?;
        Ok(output.success)
    }
}

impl std::fmt::Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.workdir.display())
    }
}

// ---------------------------------------------------------------------------
// Remote locator helpers
// ---------------------------------------------------------------------------

/// Folder a remote is cloned into when no target is given: the last path
/// segment with a trailing `.git` removed.
///
/// `https://host/course/lecture.git` becomes `lecture`.
pub fn folder_name_from_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let name = trimmed.rsplit('/').next().unwrap_or(trimmed);
    name.strip_suffix(".git").unwrap_or(name).to_string()
}

/// Check if the given URL points to a remote git repository rather than a
/// local path.
pub fn is_remote_git_url(url: &str) -> bool {
    let url = url.trim();
    if ["http://", "https://", "git://", "ssh://"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
    {
        return true;
    }
    is_scp_like(url)
}

/// `user@host:path`, where user is `[\w-]+` and host is `[\w.-]+`.
fn is_scp_like(url: &str) -> bool {
    let Some((user, rest)) = url.split_once('@') else {
        return false;
    };
    let Some((host, _path)) = rest.split_once(':') else {
        return false;
    };
    let user_ok = !user.is_empty()
        && user
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-');
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.');
    user_ok && host_ok
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
