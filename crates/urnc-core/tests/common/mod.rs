//! Fixture for integration tests: a bare "published" remote, an admin
//! checkout that pushes to it, and a student folder that the engine syncs.
//! Everything runs against the real `git` binary inside a temp directory.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use tempfile::TempDir;
use urnc_core::{NullObserver, SyncEngine, SyncRequest};

/// Run git in `dir` and return stdout; panics on a non-zero exit.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("git on PATH");
    assert!(
        output.status.success(),
        "git {} failed in {}: {}",
        args.join(" "),
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Engine that talks to real git and stays quiet.
pub fn engine() -> SyncEngine {
    SyncEngine::new().with_observer(Arc::new(NullObserver))
}

pub struct Course {
    _tmp: TempDir,
    pub root: PathBuf,
    pub remote: PathBuf,
    pub admin: PathBuf,
}

impl Course {
    /// Remote with one published commit containing `.gitignore`,
    /// `config.yaml` and `example.ipynb`.
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = tmp.path().to_path_buf();
        let remote = root.join("remote.git");
        let admin = root.join("admin");

        git(&root, &["init", "--quiet", "--bare", "-b", "main", "remote.git"]);
        git(&root, &["init", "--quiet", "-b", "main", "admin"]);
        git(&admin, &["config", "user.name", "Course Admin"]);
        git(&admin, &["config", "user.email", "admin@example.org"]);
        git(&admin, &["config", "commit.gpgsign", "false"]);
        git(&admin, &["remote", "add", "origin", &remote.to_string_lossy()]);

        let course = Self {
            _tmp: tmp,
            root,
            remote,
            admin,
        };
        course.write(".gitignore", "*.pyc\n");
        course.write("config.yaml", "name: Example Course\nversion: 0.1.0\n");
        course.write("example.ipynb", "{\"cells\": []}\n");
        course.publish();
        course
    }

    pub fn remote_url(&self) -> String {
        self.remote.to_string_lossy().to_string()
    }

    pub fn student(&self) -> PathBuf {
        self.root.join("student")
    }

    /// Sync request targeting the student folder.
    pub fn request(&self) -> SyncRequest {
        SyncRequest::new(self.remote_url()).target(self.student())
    }

    /// Write a file in the admin checkout (not yet published).
    pub fn write(&self, rel: &str, content: &str) {
        write_file(&self.admin.join(rel), content);
    }

    pub fn remove(&self, rel: &str) {
        std::fs::remove_file(self.admin.join(rel)).expect("remove admin file");
    }

    /// Commit everything in the admin checkout and push it.
    pub fn publish(&self) {
        git(&self.admin, &["add", "--all"]);
        git(&self.admin, &["commit", "--quiet", "--allow-empty", "-m", "update"]);
        git(&self.admin, &["push", "--quiet", "origin", "main:main"]);
    }

    /// Path of a file in the student folder.
    pub fn student_file(&self, rel: &str) -> PathBuf {
        self.student().join(rel)
    }

    pub fn read_student(&self, rel: &str) -> String {
        std::fs::read_to_string(self.student_file(rel)).expect("read student file")
    }

    pub fn write_student(&self, rel: &str, content: &str) {
        write_file(&self.student_file(rel), content);
    }

    pub fn student_log(&self) -> String {
        git(&self.student(), &["log", "--oneline"])
    }
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, content).expect("write file");
}

/// Names of the entries directly inside `dir`.
pub fn ls(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
