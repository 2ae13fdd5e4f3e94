//! Reporting what a sync session does while it does it.
//!
//! The session never logs through a global on its own: it hands every phase
//! transition and every automatic decision to the [`SyncObserver`] it was
//! built with. [`TracingObserver`] forwards to `tracing`, which is what the
//! CLI uses; tests use [`NullObserver`] or [`RecordingObserver`].

use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::merge::Conflict;
use crate::reconcile::RestoreSource;

/// Coarse steps of a session, in the order `sync` runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Locating,
    Fetching,
    CheckingCollisions,
    RestoringDeleted,
    Unstaging,
    Committing,
    Merging,
    Pulling,
    Done,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncPhase::Locating => "locating repository",
            SyncPhase::Fetching => "fetching changes",
            SyncPhase::CheckingCollisions => "checking for local untracked files",
            SyncPhase::RestoringDeleted => "restoring locally deleted files",
            SyncPhase::Unstaging => "unstaging all changes",
            SyncPhase::Committing => "committing local changes",
            SyncPhase::Merging => "merging from remote",
            SyncPhase::Pulling => "pulling (fast-forward only)",
            SyncPhase::Done => "done",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    Phase { phase: SyncPhase },
    Cloned { folder: PathBuf },
    /// A local file was moved aside for an incoming file of the same name.
    Renamed { from: PathBuf, to: PathBuf },
    Restored { path: String, source: RestoreSource },
    Committed { message: String },
    /// Modify/delete conflicts were settled in favour of the local files.
    ConflictResolved { paths: Vec<String> },
    MergeUnresolved { conflicts: Vec<Conflict>, message: String },
    Failed { message: String },
}

/// Receiver of session events.
pub trait SyncObserver: Send + Sync {
    fn on_event(&self, event: &SyncEvent);
}

/// Forwards events to `tracing`: phases at info, decisions that discard or
/// override something at warn, failures at error.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SyncObserver for TracingObserver {
    fn on_event(&self, event: &SyncEvent) {
        match event {
            SyncEvent::Phase { phase } => info!(%phase, "sync phase"),
            SyncEvent::Cloned { folder } => {
                info!(folder = %folder.display(), "cloned successfully")
            }
            SyncEvent::Renamed { from, to } => warn!(
                from = %from.display(),
                to = %to.display(),
                "renamed local file to avoid merge conflict with incoming file"
            ),
            SyncEvent::Restored {
                path,
                source: RestoreSource::Remote,
            } => warn!(%path, "restoring locally deleted file from remote"),
            SyncEvent::Restored {
                path,
                source: RestoreSource::Head,
            } => info!(%path, "restoring locally deleted file from HEAD before upstream deletion"),
            SyncEvent::Committed { message } => info!(%message, "created commit"),
            SyncEvent::ConflictResolved { paths } => warn!(
                paths = ?paths,
                "found CONFLICT (modify/delete); keeping the local files by committing"
            ),
            SyncEvent::MergeUnresolved {
                conflicts,
                message,
            } => error!(
                conflicts = ?conflicts,
                %message,
                "merge failed and could not be resolved automatically"
            ),
            SyncEvent::Failed { message } => error!(%message, "sync failed"),
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SyncObserver for NullObserver {
    fn on_event(&self, _event: &SyncEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Phases seen so far, in order.
    pub fn phases(&self) -> Vec<SyncPhase> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SyncEvent::Phase { phase } => Some(phase),
                _ => None,
            })
            .collect()
    }
}

impl SyncObserver for RecordingObserver {
    fn on_event(&self, event: &SyncEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_observer_keeps_order() {
        let obs = RecordingObserver::new();
        obs.on_event(&SyncEvent::Phase {
            phase: SyncPhase::Fetching,
        });
        obs.on_event(&SyncEvent::Committed {
            message: "Automatic commit by urnc".into(),
        });
        obs.on_event(&SyncEvent::Phase {
            phase: SyncPhase::Merging,
        });
        assert_eq!(obs.events().len(), 3);
        assert_eq!(obs.phases(), vec![SyncPhase::Fetching, SyncPhase::Merging]);
    }

    #[test]
    fn tracing_observer_handles_every_event() {
        let obs = TracingObserver;
        obs.on_event(&SyncEvent::Renamed {
            from: "a.txt".into(),
            to: "a_20240101000000.txt".into(),
        });
        obs.on_event(&SyncEvent::Restored {
            path: "a.txt".into(),
            source: RestoreSource::Remote,
        });
        obs.on_event(&SyncEvent::Failed {
            message: "boom".into(),
        });
    }

    #[test]
    fn event_serialize() {
        let json = serde_json::to_string(&SyncEvent::Phase {
            phase: SyncPhase::CheckingCollisions,
        })
        .unwrap();
        assert_eq!(json, r#"{"event":"phase","phase":"checking_collisions"}"#);
    }

    #[test]
    fn phase_display() {
        assert_eq!(SyncPhase::Fetching.to_string(), "fetching changes");
    }
}
