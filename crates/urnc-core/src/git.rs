use std::path::Path;
use std::process::Command;

// ---------------------------------------------------------------------------
// GitRunner trait (for testability)
// ---------------------------------------------------------------------------

/// Abstraction over git CLI operations so they can be mocked in tests.
///
/// Every write the sync engine performs (fetch, checkout, commit, merge)
/// goes through this trait. Reads that libgit2 can answer cheaply live in
/// [`crate::git2_ops`] instead.
pub trait GitRunner: Send + Sync {
    /// Run `git <args>` in `dir`. Only a failure to spawn the process is an
    /// `Err`; a non-zero exit is reported through [`GitOutput::success`].
    fn run_git(&self, dir: &Path, args: &[&str]) -> std::io::Result<GitOutput>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// Output of a command that exited 0 with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Output of a command that exited non-zero with the given stderr.
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Human-readable failure text: stderr if present, stdout otherwise.
    ///
    /// `git merge` prints its CONFLICT lines on stdout, so stderr alone is
    /// often empty.
    pub fn failure_text(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Split `-z` output into its NUL-terminated records, dropping empty ones.
/// Records are not trimmed: paths may begin or end with spaces.
pub fn nul_separated(output: &str) -> Vec<String> {
    output
        .split('\0')
        .filter(|r| !r.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Real git runner that shells out to the `git` binary.
pub struct RealGitRunner;

impl GitRunner for RealGitRunner {
    fn run_git(&self, dir: &Path, args: &[&str]) -> std::io::Result<GitOutput> {
        tracing::debug!(dir = %dir.display(), args = ?args, "git");
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()?;

        Ok(GitOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::sync::Mutex;

    /// A mock git runner that records commands and returns canned responses.
    ///
    /// Responses are matched by the first argument prefix registered with
    /// [`MockGitRunner::on`]; unmatched commands succeed with empty output.
    pub(crate) struct MockGitRunner {
        responses: Mutex<Vec<(Vec<String>, GitOutput)>>,
        commands: Mutex<Vec<Vec<String>>>,
    }

    impl MockGitRunner {
        pub(crate) fn new() -> Self {
            Self {
                responses: Mutex::new(Vec::new()),
                commands: Mutex::new(Vec::new()),
            }
        }

        /// Queue `output` for the next command starting with `prefix`.
        pub(crate) fn on(self, prefix: &[&str], output: GitOutput) -> Self {
            self.responses.lock().unwrap().push((
                prefix.iter().map(|s| s.to_string()).collect(),
                output,
            ));
            self
        }

        pub(crate) fn commands(&self) -> Vec<Vec<String>> {
            self.commands.lock().unwrap().clone()
        }

        /// Commands joined with spaces, for compact assertions.
        pub(crate) fn command_lines(&self) -> Vec<String> {
            self.commands().iter().map(|c| c.join(" ")).collect()
        }
    }

    impl GitRunner for MockGitRunner {
        fn run_git(&self, _dir: &Path, args: &[&str]) -> std::io::Result<GitOutput> {
            let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
            self.commands.lock().unwrap().push(args.clone());

            let mut responses = self.responses.lock().unwrap();
            let pos = responses
                .iter()
                .position(|(prefix, _)| args.starts_with(prefix));
            match pos {
                Some(pos) => Ok(responses.remove(pos).1),
                None => Ok(GitOutput::ok("")),
            }
        }
    }
}
