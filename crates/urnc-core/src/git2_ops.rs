//! Native git read operations via libgit2 (git2 crate).
//!
//! Opening a repository, reading its remote URL and checking for branches
//! happen in-process. Everything that changes the repository (clone, fetch,
//! checkout, commit, merge) stays a shell-out through [`crate::git::GitRunner`]
//! so the merge strategy and the on-disk result are exactly what `git` does.
//!
//! # Feature gated
//!
//! This module is only available with the `libgit2` feature flag (enabled
//! by default). When disabled, [`crate::repo::Repository`] falls back to
//! shell-outs for the same queries.

use std::path::Path;

use crate::repo::{RepoError, Repository};

// ---------------------------------------------------------------------------
// Error bridging
// ---------------------------------------------------------------------------

impl From<git2::Error> for RepoError {
    fn from(e: git2::Error) -> Self {
        RepoError::GitCommand(e.message().to_string())
    }
}

// ---------------------------------------------------------------------------
// Native read operations
// ---------------------------------------------------------------------------

/// Native git read operations using libgit2.
///
/// Stateless: opens the repo fresh for each call, so nothing cached here can
/// go stale while the shell-outs rewrite the index.
pub struct Git2ReadOps;

impl Git2ReadOps {
    /// Discover the repository containing `start` (replaces
    /// `git rev-parse --show-toplevel`).
    pub fn discover(start: &Path) -> Result<Repository, RepoError> {
        let repo = git2::Repository::discover(start)
            .map_err(|_| RepoError::NotFound(start.display().to_string()))?;
        Self::handle(&repo, start)
    }

    /// Open the repository whose working directory is exactly `path`.
    pub fn open(path: &Path) -> Result<Repository, RepoError> {
        let repo = git2::Repository::open(path)
            .map_err(|_| RepoError::NotARepo(path.display().to_string()))?;
        Self::handle(&repo, path)
    }

    fn handle(repo: &git2::Repository, requested: &Path) -> Result<Repository, RepoError> {
        let workdir = repo
            .workdir()
            .ok_or_else(|| RepoError::NotARepo(requested.display().to_string()))?;
        let workdir = workdir
            .to_str()
            .map(|s| s.trim_end_matches('/'))
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|| workdir.to_path_buf());
        let branch = Self::head_branch(repo)
            .ok_or_else(|| RepoError::DetachedHead(workdir.display().to_string()))?;

        Ok(Repository::new(repo.path(), workdir, branch))
    }

    /// Name of the checked-out branch, including an unborn one.
    fn head_branch(repo: &git2::Repository) -> Option<String> {
        match repo.head() {
            Ok(head) if head.is_branch() => head.shorthand().map(ToOwned::to_owned),
            Ok(_) => None,
            Err(_) => {
                // Unborn branch: HEAD is a symbolic ref to a missing target.
                let head = repo.find_reference("HEAD").ok()?;
                head.symbolic_target()
                    .and_then(|t| t.strip_prefix("refs/heads/"))
                    .map(ToOwned::to_owned)
            }
        }
    }

    /// URL of `remote` (replaces `git remote get-url`). `Ok(None)` when the
    /// remote does not exist.
    pub fn remote_url(workdir: &Path, remote: &str) -> Result<Option<String>, RepoError> {
        let repo = git2::Repository::open(workdir)?;
        let url = match repo.find_remote(remote) {
            Ok(found) => found.url().map(ToOwned::to_owned),
            Err(e) if e.code() == git2::ErrorCode::NotFound => None,
            Err(e) => return Err(RepoError::from(e)),
        };
        Ok(url)
    }

    /// Whether `name` exists as a local branch or as `origin/<name>`.
    pub fn branch_exists(workdir: &Path, name: &str) -> Result<bool, RepoError> {
        let repo = git2::Repository::open(workdir)?;
        if repo.find_branch(name, git2::BranchType::Local).is_ok() {
            return Ok(true);
        }
        let remote_name = format!("{}/{name}", crate::repo::ORIGIN);
        let exists = repo
            .find_branch(&remote_name, git2::BranchType::Remote)
            .is_ok();
        Ok(exists)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn init_repo(dir: &Path) -> git2::Repository {
        let mut opts = git2::RepositoryInitOptions::new();
        opts.initial_head("main");
        git2::Repository::init_opts(dir, &opts).unwrap()
    }

    fn commit_file(repo: &git2::Repository, name: &str, content: &str) {
        let workdir = repo.workdir().unwrap();
        std::fs::write(workdir.join(name), content).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = git2::Signature::now("test", "test@example.com").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &parents)
            .unwrap();
    }

    #[test]
    fn open_reads_branch_and_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let raw = init_repo(tmp.path());
        commit_file(&raw, "a.txt", "a");

        let repo = Git2ReadOps::open(tmp.path()).unwrap();
        assert_eq!(repo.branch(), "main");
        assert!(repo.gitdir().ends_with(".git"));
    }

    #[test]
    fn open_unborn_branch() {
        let tmp = tempfile::tempdir().unwrap();
        init_repo(tmp.path());
        let repo = Git2ReadOps::open(tmp.path()).unwrap();
        assert_eq!(repo.branch(), "main");
    }

    #[test]
    fn open_plain_folder_is_not_a_repo() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Git2ReadOps::open(tmp.path()).unwrap_err();
        assert!(matches!(err, RepoError::NotARepo(_)));
    }

    #[test]
    fn discover_walks_up() {
        let tmp = tempfile::tempdir().unwrap();
        let raw = init_repo(tmp.path());
        commit_file(&raw, "a.txt", "a");
        let nested = tmp.path().join("lectures").join("week1");
        std::fs::create_dir_all(&nested).unwrap();

        let repo = Git2ReadOps::discover(&nested).unwrap();
        assert_eq!(
            repo.workdir().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn remote_url_and_missing_remote() {
        let tmp = tempfile::tempdir().unwrap();
        let raw = init_repo(tmp.path());
        assert_eq!(Git2ReadOps::remote_url(tmp.path(), "origin").unwrap(), None);

        raw.remote("origin", "https://example.com/course.git").unwrap();
        assert_eq!(
            Git2ReadOps::remote_url(tmp.path(), "origin").unwrap().as_deref(),
            Some("https://example.com/course.git")
        );
    }

    #[test]
    fn branch_exists_checks_local_branches() {
        let tmp = tempfile::tempdir().unwrap();
        let raw = init_repo(tmp.path());
        commit_file(&raw, "a.txt", "a");
        assert!(Git2ReadOps::branch_exists(tmp.path(), "main").unwrap());
        assert!(!Git2ReadOps::branch_exists(tmp.path(), "solutions").unwrap());
    }
}
