use urnc_core::{Config, SyncOutcome};

use super::{engine, SyncArgs};

/// Run the `pull` subcommand: clone if missing, otherwise reconcile local
/// changes and merge upstream.
pub fn run(config: &Config, args: &SyncArgs) -> SyncOutcome {
    let request = args.request(config);
    tracing::debug!(?request, "pull");
    engine(config).sync(&request)
}
