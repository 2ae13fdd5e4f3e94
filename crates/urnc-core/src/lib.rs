//! Keeps a consumer's working copy of a published repository in sync with
//! upstream without ever losing the consumer's own edits.

pub mod changes;
pub mod collisions;
pub mod config;
pub mod git;
pub mod locate;
pub mod merge;
pub mod observer;
pub mod reconcile;
pub mod repo;
pub mod session;
pub mod snapshot;

#[cfg(feature = "libgit2")]
pub mod git2_ops;

pub use config::{Config, ConfigError};
pub use git::{GitOutput, GitRunner, RealGitRunner};
pub use locate::SyncRequest;
pub use merge::{Conflict, ConflictKind, MergeOutcome};
pub use observer::{NullObserver, RecordingObserver, SyncEvent, SyncObserver, TracingObserver};
pub use repo::{folder_name_from_url, is_remote_git_url, RepoError, Repository};
pub use session::{
    follow, sync, FailureReason, SyncEngine, SyncError, SyncFailure, SyncOutcome, SyncReport,
    SyncSession,
};
pub use snapshot::Identity;
