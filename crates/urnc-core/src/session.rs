//! The sync session: one repository, one git runner, one observer, and the
//! fixed sequence of steps that brings a student checkout up to date.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::changes::{classify, UpstreamChanges};
use crate::collisions::{resolve_collisions, Renamed};
use crate::git::{GitRunner, RealGitRunner};
use crate::locate::{self, Located, SyncRequest};
use crate::merge::{fast_forward, merge_remote, MergeOutcome};
use crate::observer::{SyncEvent, SyncObserver, SyncPhase, TracingObserver};
use crate::reconcile::{restore_deleted, unstage_all, Restored};
use crate::repo::{RepoError, Repository, ORIGIN};
use crate::snapshot::{ensure_identity, snapshot, Identity, SNAPSHOT_MESSAGE};

// ---------------------------------------------------------------------------
// Errors and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Machine-readable cause of a failed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    RepositoryNotFound,
    NotARepository,
    RemoteMismatch,
    DetachedHead,
    CloneFailed,
    /// The merge stopped on conflicts it could not settle.
    MergeFailed,
    /// `pull --ff-only` refused because local history diverged.
    FastForwardFailed,
    /// Any other git or filesystem failure.
    GitFailure,
}

impl FailureReason {
    fn of(err: &SyncError) -> Self {
        match err {
            SyncError::Repo(RepoError::NotFound(_)) => FailureReason::RepositoryNotFound,
            SyncError::Repo(RepoError::NotARepo(_)) => FailureReason::NotARepository,
            SyncError::Repo(RepoError::RemoteMismatch { .. }) => FailureReason::RemoteMismatch,
            SyncError::Repo(RepoError::DetachedHead(_)) => FailureReason::DetachedHead,
            SyncError::Repo(RepoError::CloneFailed { .. }) => FailureReason::CloneFailed,
            SyncError::Repo(RepoError::Diverged { .. }) => FailureReason::FastForwardFailed,
            _ => FailureReason::GitFailure,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub reason: FailureReason,
    pub message: String,
}

/// Everything a completed `sync` did to the working copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub workdir: PathBuf,
    pub upstream: UpstreamChanges,
    pub renamed: Vec<Renamed>,
    pub restored: Vec<Restored>,
    pub snapshot_committed: bool,
    pub merge: MergeOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The target did not exist and was cloned; nothing else to do.
    Cloned { folder: PathBuf },
    Synced(SyncReport),
    /// Follow mode fast-forwarded (or was already up to date).
    Followed { workdir: PathBuf },
    Failed(SyncFailure),
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, SyncOutcome::Failed(_))
    }

    pub fn failure(&self) -> Option<&SyncFailure> {
        match self {
            SyncOutcome::Failed(f) => Some(f),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// SyncEngine: builds sessions
// ---------------------------------------------------------------------------

/// Entry point for `sync` and `follow`.
///
/// Holds the collaborators every session needs. Neither entry point returns
/// an error or panics on git failures; they always produce a
/// [`SyncOutcome`], because the intended caller is a notebook server's
/// start-up hook that must not die when a sync goes wrong.
pub struct SyncEngine {
    git: Box<dyn GitRunner>,
    observer: Arc<dyn SyncObserver>,
    identity: Identity,
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncEngine {
    /// Engine with the real git runner and the tracing observer.
    pub fn new() -> Self {
        Self {
            git: Box::new(RealGitRunner),
            observer: Arc::new(TracingObserver),
            identity: Identity::default(),
        }
    }

    /// Replace the git runner (for testing).
    pub fn with_git_runner(mut self, git: Box<dyn GitRunner>) -> Self {
        self.git = git;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Identity written to repositories that have none.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    /// Run the full reconcile-and-merge session.
    pub fn sync(&self, request: &SyncRequest) -> SyncOutcome {
        let outcome = match self.try_sync(request) {
            Ok(outcome) => outcome,
            Err(err) => SyncOutcome::Failed(SyncFailure {
                reason: FailureReason::of(&err),
                message: err.to_string(),
            }),
        };
        self.finish(outcome)
    }

    /// Run the fast-forward-only session.
    pub fn follow(&self, request: &SyncRequest) -> SyncOutcome {
        let outcome = match self.try_follow(request) {
            Ok(outcome) => outcome,
            Err(err) => SyncOutcome::Failed(SyncFailure {
                reason: FailureReason::of(&err),
                message: err.to_string(),
            }),
        };
        self.finish(outcome)
    }

    /// Session over an already located repository.
    pub fn session(&self, repo: Repository) -> SyncSession<'_> {
        SyncSession {
            repo,
            git: self.git.as_ref(),
            observer: self.observer.as_ref(),
            identity: &self.identity,
        }
    }

    fn try_sync(&self, request: &SyncRequest) -> Result<SyncOutcome, SyncError> {
        match self.locate(request)? {
            Located::Cloned(folder) => Ok(SyncOutcome::Cloned { folder }),
            Located::Existing(repo) => self.session(repo).run(),
        }
    }

    fn try_follow(&self, request: &SyncRequest) -> Result<SyncOutcome, SyncError> {
        match self.locate(request)? {
            Located::Cloned(folder) => Ok(SyncOutcome::Cloned { folder }),
            Located::Existing(repo) => self.session(repo).follow(),
        }
    }

    fn locate(&self, request: &SyncRequest) -> Result<Located, SyncError> {
        self.emit(SyncEvent::Phase {
            phase: SyncPhase::Locating,
        });
        let located = locate::locate(request, self.git.as_ref())?;
        if let Located::Cloned(folder) = &located {
            self.emit(SyncEvent::Cloned {
                folder: folder.clone(),
            });
        }
        Ok(located)
    }

    fn finish(&self, outcome: SyncOutcome) -> SyncOutcome {
        match &outcome {
            SyncOutcome::Failed(failure) => self.emit(SyncEvent::Failed {
                message: failure.message.clone(),
            }),
            _ => self.emit(SyncEvent::Phase {
                phase: SyncPhase::Done,
            }),
        }
        outcome
    }

    fn emit(&self, event: SyncEvent) {
        self.observer.on_event(&event);
    }

    /// Open or clone the repository a publish step writes into.
    ///
    /// Unlike [`SyncEngine::sync`] this returns errors: the publisher runs in
    /// CI, where a failure should stop the pipeline.
    pub fn materialize_target(&self, remote: &str, folder: &Path) -> Result<Repository, SyncError> {
        let git = self.git.as_ref();
        let repo = if folder.exists() {
            let repo = locate::open_matching(remote, folder, git)?;
            tracing::info!(folder = %folder.display(), "returning existing repo");
            repo
        } else {
            tracing::info!(remote, folder = %folder.display(), "cloning publish target");
            locate::clone(remote, folder, None, None, git)?;
            Repository::open(folder, git)?
        };
        ensure_identity(&repo, git, &self.identity, false)?;
        Ok(repo)
    }
}

// ---------------------------------------------------------------------------
// SyncSession: the steps
// ---------------------------------------------------------------------------

/// One located working copy and the collaborators to operate on it.
///
/// Each step is a method, so tests can run them one at a time against a
/// fixture repository or a mock runner.
pub struct SyncSession<'a> {
    repo: Repository,
    git: &'a dyn GitRunner,
    observer: &'a dyn SyncObserver,
    identity: &'a Identity,
}

impl<'a> SyncSession<'a> {
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// All steps of `sync`, in order.
    pub fn run(&self) -> Result<SyncOutcome, SyncError> {
        self.fetch()?;
        let upstream = self.classify()?;
        let renamed = self.resolve_collisions(&upstream)?;
        let restored = self.reconcile_deletions(&upstream)?;
        let snapshot_committed = self.snapshot()?;
        let merge = self.merge()?;

        if let MergeOutcome::Unresolved { conflicts, message } = &merge {
            return Ok(SyncOutcome::Failed(SyncFailure {
                reason: FailureReason::MergeFailed,
                message: format!(
                    "merge of {} left {} unresolved conflict(s): {message}",
                    self.repo.remote_branch(),
                    conflicts.len()
                ),
            }));
        }

        Ok(SyncOutcome::Synced(SyncReport {
            workdir: self.repo.workdir().to_path_buf(),
            upstream,
            renamed,
            restored,
            snapshot_committed,
            merge,
        }))
    }

    /// Fetch, then fast-forward only.
    pub fn follow(&self) -> Result<SyncOutcome, SyncError> {
        self.fetch()?;
        self.phase(SyncPhase::Pulling);
        fast_forward(&self.repo, self.git)?;
        Ok(SyncOutcome::Followed {
            workdir: self.repo.workdir().to_path_buf(),
        })
    }

    pub fn fetch(&self) -> Result<(), SyncError> {
        self.phase(SyncPhase::Fetching);
        self.repo.git(self.git, &["fetch", ORIGIN])?;
        Ok(())
    }

    pub fn classify(&self) -> Result<UpstreamChanges, SyncError> {
        Ok(classify(&self.repo, self.git)?)
    }

    pub fn resolve_collisions(&self, upstream: &UpstreamChanges) -> Result<Vec<Renamed>, SyncError> {
        self.phase(SyncPhase::CheckingCollisions);
        let renamed = resolve_collisions(&self.repo, upstream)?;
        for r in &renamed {
            self.emit(SyncEvent::Renamed {
                from: r.from.clone(),
                to: r.to.clone(),
            });
        }
        Ok(renamed)
    }

    /// Restore locally deleted files, then unstage what the restore staged.
    pub fn reconcile_deletions(
        &self,
        upstream: &UpstreamChanges,
    ) -> Result<Vec<Restored>, SyncError> {
        self.phase(SyncPhase::RestoringDeleted);
        let restored = restore_deleted(&self.repo, self.git, upstream)?;
        for r in &restored {
            self.emit(SyncEvent::Restored {
                path: r.path.clone(),
                source: r.source,
            });
        }
        self.phase(SyncPhase::Unstaging);
        unstage_all(&self.repo, self.git)?;
        Ok(restored)
    }

    /// Ensure an identity and commit the working tree if it is dirty.
    pub fn snapshot(&self) -> Result<bool, SyncError> {
        ensure_identity(&self.repo, self.git, self.identity, false)?;
        self.phase(SyncPhase::Committing);
        let committed = snapshot(&self.repo, self.git)?;
        if committed {
            self.emit(SyncEvent::Committed {
                message: SNAPSHOT_MESSAGE.to_string(),
            });
        }
        Ok(committed)
    }

    pub fn merge(&self) -> Result<MergeOutcome, SyncError> {
        self.phase(SyncPhase::Merging);
        let outcome = merge_remote(&self.repo, self.git)?;
        match &outcome {
            MergeOutcome::Merged => {}
            MergeOutcome::ModifyDeleteResolved { paths } => {
                self.emit(SyncEvent::ConflictResolved {
                    paths: paths.clone(),
                })
            }
            MergeOutcome::Unresolved { conflicts, message } => {
                self.emit(SyncEvent::MergeUnresolved {
                    conflicts: conflicts.clone(),
                    message: message.clone(),
                })
            }
        }
        Ok(outcome)
    }

    fn phase(&self, phase: SyncPhase) {
        self.emit(SyncEvent::Phase { phase });
    }

    fn emit(&self, event: SyncEvent) {
        self.observer.on_event(&event);
    }
}

// ---------------------------------------------------------------------------
// Convenience entry points
// ---------------------------------------------------------------------------

/// [`SyncEngine::sync`] with the real git runner and tracing output.
pub fn sync(request: &SyncRequest) -> SyncOutcome {
    SyncEngine::new().sync(request)
}

/// [`SyncEngine::follow`] with the real git runner and tracing output.
pub fn follow(request: &SyncRequest) -> SyncOutcome {
    SyncEngine::new().follow(request)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
