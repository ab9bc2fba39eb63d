//! `snapshot`: connect, wait for the handshake, print the event list once.

use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use calsync_core::LiveSync;

use crate::cli::{GlobalOpts, SnapshotArgs};
use crate::error::CliError;
use crate::output;

use super::{stream_error, wait_finished};

pub async fn handle(
    sync: &LiveSync,
    profile: &str,
    args: &SnapshotArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let store = sync.store();

    // A selector callback runs on every write, so the handshake is seen
    // even if the stream ends right after it.
    let (seen_tx, mut seen) = watch::channel(false);
    let _connected = store.subscribe_selected(
        |s| s.connected,
        move |connected| {
            if *connected {
                seen_tx.send_replace(true);
            }
        },
    );

    let mut state = sync.connection_state();
    sync.start().await.map_err(|e| stream_error(e, profile))?;

    let handshake_seen = tokio::time::timeout(Duration::from_secs(args.timeout), async {
        tokio::select! {
            biased;
            () = wait_handshake(&mut seen) => true,
            () = wait_finished(&mut state) => false,
        }
    })
    .await;

    match handshake_seen {
        Err(_) => {
            sync.stop().await;
            return Err(CliError::Timeout {
                seconds: args.timeout,
            });
        }
        Ok(false) => {
            sync.stop().await;
            // The closing write may have raced the handshake notification.
            if !*seen.borrow() {
                return Err(sync.last_error().map_or_else(
                    || CliError::StreamFailed {
                        reason: "stream closed before the connected handshake".into(),
                    },
                    |e| stream_error(e, profile),
                ));
            }
        }
        Ok(true) => {
            debug!(wait = args.wait, "handshake received; collecting updates");
            tokio::select! {
                () = tokio::time::sleep(Duration::from_secs(args.wait)) => {}
                () = wait_finished(&mut state) => {}
            }
            sync.stop().await;
        }
    }

    if let Some(e) = sync.last_error() {
        return Err(stream_error(e, profile));
    }

    let snapshot = store.get();
    let events = output::by_start(&snapshot.events);
    let out = output::render_list(global.output, &events, output::event_row, output::event_line)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn wait_handshake(seen: &mut watch::Receiver<bool>) {
    let _ = seen.wait_for(|seen| *seen).await;
}
