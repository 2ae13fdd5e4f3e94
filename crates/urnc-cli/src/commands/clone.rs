use urnc_core::{Config, SyncOutcome};

use super::{engine, SyncArgs};

/// Run the `clone` subcommand: clone if missing, otherwise fast-forward only.
pub fn run(config: &Config, args: &SyncArgs) -> SyncOutcome {
    let request = args.request(config);
    tracing::debug!(?request, "clone");
    engine(config).follow(&request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use urnc_core::FailureReason;

    #[test]
    fn clone_of_missing_remote_fails_softly() {
        let tmp = tempfile::tempdir().unwrap();
        let args = SyncArgs {
            git_url: Some(tmp.path().join("missing.git").to_string_lossy().to_string()),
            output: Some(tmp.path().join("lecture")),
            ..SyncArgs::default()
        };

        let outcome = run(&Config::default(), &args);

        assert_eq!(
            outcome.failure().map(|f| f.reason),
            Some(FailureReason::CloneFailed)
        );
        assert!(!tmp.path().join("lecture").exists());
    }
}
