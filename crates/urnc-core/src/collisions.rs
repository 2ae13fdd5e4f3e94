//! Moving local files out of the way of files newly published upstream.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::changes::UpstreamChanges;
use crate::repo::{Repository, Result};

/// A local file renamed to avoid an add/add collision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renamed {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// `<stem>_<YYYYMMDDHHMMSS><ext>` in the same directory as `path`.
pub fn timestamped_path(path: &Path, now: DateTime<Local>) -> PathBuf {
    let stamp = now.format("%Y%m%d%H%M%S");
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_{stamp}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{stamp}"),
    };
    path.with_file_name(name)
}

/// Rename every on-disk file whose path is added upstream.
///
/// Such a file is necessarily untracked locally (the path is absent from the
/// local tip), and `git merge` refuses to overwrite it.
pub fn resolve_collisions(repo: &Repository, changes: &UpstreamChanges) -> Result<Vec<Renamed>> {
    resolve_collisions_at(repo, changes, Local::now())
}

pub(crate) fn resolve_collisions_at(
    repo: &Repository,
    changes: &UpstreamChanges,
    now: DateTime<Local>,
) -> Result<Vec<Renamed>> {
    let mut renamed = Vec::new();
    for added in changes.added() {
        let from = repo.workdir().join(added);
        if std::fs::symlink_metadata(&from).is_err() {
            continue;
        }
        let to = timestamped_path(&from, now);
        std::fs::rename(&from, &to)?;
        renamed.push(Renamed { from, to });
    }
    Ok(renamed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::parse_name_status;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 10, 14, 9, 5, 7).unwrap()
    }

    #[test]
    fn timestamp_goes_before_extension() {
        let p = timestamped_path(Path::new("/w/collision.txt"), fixed_now());
        assert_eq!(p, PathBuf::from("/w/collision_20241014090507.txt"));
    }

    #[test]
    fn timestamp_without_extension() {
        let p = timestamped_path(Path::new("/w/Makefile"), fixed_now());
        assert_eq!(p, PathBuf::from("/w/Makefile_20241014090507"));
    }

    #[test]
    fn only_last_extension_is_kept_apart() {
        let p = timestamped_path(Path::new("/w/data.tar.gz"), fixed_now());
        assert_eq!(p, PathBuf::from("/w/data.tar_20241014090507.gz"));
    }

    #[test]
    fn colliding_files_are_renamed() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("collision.txt"), "local file").unwrap();
        std::fs::create_dir(tmp.path().join("week2")).unwrap();
        std::fs::write(tmp.path().join("week2/notes.md"), "mine").unwrap();

        let repo = Repository::new(tmp.path().join(".git"), tmp.path(), "main");
        let changes =
            parse_name_status("A\0collision.txt\0A\0week2/notes.md\0A\0absent.txt\0M\0other.txt\0");
        let renamed = resolve_collisions_at(&repo, &changes, fixed_now()).unwrap();

        assert_eq!(renamed.len(), 2);
        assert!(!tmp.path().join("collision.txt").exists());
        let moved = tmp.path().join("collision_20241014090507.txt");
        assert_eq!(std::fs::read_to_string(moved).unwrap(), "local file");
        assert!(tmp.path().join("week2/notes_20241014090507.md").exists());
    }

    #[test]
    fn nothing_added_nothing_renamed() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "a").unwrap();
        let repo = Repository::new(tmp.path().join(".git"), tmp.path(), "main");
        let renamed = resolve_collisions(&repo, &parse_name_status("M\0a.txt\0")).unwrap();
        assert!(renamed.is_empty());
        assert!(tmp.path().join("a.txt").exists());
    }
}
