//! Relative remotes and targets resolve against the working directory.
//!
//! Kept in its own test binary: it changes the process working directory.

mod common;

use common::{engine, Course};
use urnc_core::{SyncOutcome, SyncRequest};

#[test]
fn relative_remote_clones_into_nested_target() {
    let course = Course::new();
    std::env::set_current_dir(&course.root).unwrap();

    let outcome = engine().sync(&SyncRequest::new("remote.git").target("nested/pulled"));

    assert!(
        matches!(outcome, SyncOutcome::Cloned { .. }),
        "expected a clone, got {outcome:?}"
    );
    let cloned = course.root.join("nested/pulled");
    assert!(cloned.join("config.yaml").is_file());
    assert!(cloned.join("example.ipynb").is_file());
}
