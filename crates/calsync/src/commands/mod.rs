//! Command dispatch: bridges CLI args -> `LiveSync` -> output formatting.

pub mod config_cmd;
pub mod snapshot;
pub mod watch;

use tokio::sync::watch as state_watch;

use calsync_core::{ConnectionState, CoreError, LiveSync};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a stream-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    sync: &LiveSync,
    profile: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::handle(sync, profile, &args, global).await,
        Command::Snapshot(args) => snapshot::handle(sync, profile, &args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal {
            message: "command does not use the event stream".into(),
        }),
    }
}

// ── Shared helpers ──────────────────────────────────────────────────

/// Resolve once the current connection has closed or failed.
async fn wait_finished(state: &mut state_watch::Receiver<ConnectionState>) {
    let _ = state.wait_for(|s| s.is_finished()).await;
}

fn stream_error(err: CoreError, profile: &str) -> CliError {
    CliError::from(err).for_profile(profile)
}
