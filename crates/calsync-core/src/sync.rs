// ── Live sync ──
//
// Wires one stream connection into the store: every live message becomes
// a `patch_for` update, and connection loss is mirrored into the
// `connected`/`error`/`notification` slices. Reconnecting is the caller's
// call (`restart`); there is no backoff here.

use std::sync::{Arc, PoisonError};

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use calsync_api::{ConnectionState, MessageStream, StreamClient};

use crate::config::SyncConfig;
use crate::error::CoreError;
use crate::message::LiveMessage;
use crate::model::Notification;
use crate::reducer::patch_for;
use crate::store::{AppPatch, AppState, Store};

/// Owns the active stream connection for a store.
pub struct LiveSync {
    config: SyncConfig,
    store: Arc<Store<AppState>>,
    state: Arc<watch::Sender<ConnectionState>>,
    last_error: Arc<std::sync::Mutex<Option<CoreError>>>,
    active: Mutex<Option<Active>>,
}

struct Active {
    client: StreamClient,
    bridge: JoinHandle<()>,
    mirror: JoinHandle<()>,
}

impl LiveSync {
    pub fn new(config: SyncConfig, store: Arc<Store<AppState>>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            config,
            store,
            state: Arc::new(state),
            last_error: Arc::default(),
            active: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<Store<AppState>> {
        &self.store
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Open a fresh connection and start applying its messages.
    ///
    /// Fails with [`CoreError::AlreadyRunning`] while a previous connection
    /// is still delivering; a connection that already ended is replaced.
    pub async fn start(&self) -> Result<(), CoreError> {
        let mut active = self.active.lock().await;
        if active.as_ref().is_some_and(|a| !a.bridge.is_finished()) {
            return Err(CoreError::AlreadyRunning);
        }
        if let Some(stale) = active.take() {
            stale.mirror.abort();
        }

        let client = StreamClient::from_transport(
            &self.config.transport,
            self.config.url.clone(),
            Arc::clone(&self.config.credentials),
            self.config.options.clone(),
        )?;

        let messages = match client.connect() {
            Ok(messages) => messages,
            Err(e) => {
                self.state.send_replace(client.state());
                return Err(e.into());
            }
        };

        *lock(&self.last_error) = None;
        self.state.send_replace(client.state());
        let mirror = tokio::spawn(mirror_state(client.watch_state(), Arc::clone(&self.state)));
        let bridge = tokio::spawn(bridge(
            messages,
            Arc::clone(&self.store),
            Arc::clone(&self.last_error),
        ));

        *active = Some(Active {
            client,
            bridge,
            mirror,
        });
        info!(url = %self.config.url, "live sync started");
        Ok(())
    }

    /// Close the connection and wait for the bridge to finish. Idempotent.
    pub async fn stop(&self) {
        let Some(active) = self.active.lock().await.take() else {
            return;
        };

        active.client.disconnect();
        if let Err(e) = active.bridge.await {
            warn!(error = %e, "live sync bridge task failed");
        }
        active.mirror.abort();
        self.state.send_replace(active.client.state());
        info!("live sync stopped");
    }

    /// Drop the current connection and open a new one.
    pub async fn restart(&self) -> Result<(), CoreError> {
        self.stop().await;
        self.start().await
    }

    /// Whether a connection is currently delivering messages.
    pub async fn is_running(&self) -> bool {
        self.active
            .lock()
            .await
            .as_ref()
            .is_some_and(|a| !a.bridge.is_finished())
    }

    /// Observe the state of whichever connection is current.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// The error that ended the most recent connection, if it failed.
    ///
    /// Cleared by the next successful [`start`](Self::start).
    pub fn last_error(&self) -> Option<CoreError> {
        lock(&self.last_error).clone()
    }
}

fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Background tasks ─────────────────────────────────────────────────

/// Apply every message to the store until the stream ends.
async fn bridge(
    mut messages: MessageStream,
    store: Arc<Store<AppState>>,
    last_error: Arc<std::sync::Mutex<Option<CoreError>>>,
) {
    while let Some(item) = messages.next_message().await {
        match item {
            Ok(message) => {
                let Some(live) = LiveMessage::from_stream(message) else {
                    continue;
                };
                debug!(kind = live.kind(), "applying live message");
                store.update(|state| patch_for(state, &live));
            }
            Err(e) if !e.is_terminal() => {
                warn!(error = %e, "skipping malformed live message");
            }
            Err(e) => {
                let err = CoreError::from(e);
                warn!(error = %err, "live stream failed");
                store.set(
                    AppPatch::new()
                        .connected(false)
                        .error(err.to_string())
                        .notify(Notification::error("Live updates disconnected")),
                );
                *lock(&last_error) = Some(err);
                return;
            }
        }
    }

    store.set(AppPatch::new().connected(false));
    debug!("live stream ended");
}

/// Copy a client's state transitions into the sync-level channel.
async fn mirror_state(
    mut client: watch::Receiver<ConnectionState>,
    sync: Arc<watch::Sender<ConnectionState>>,
) {
    loop {
        let state = *client.borrow_and_update();
        sync.send_replace(state);
        if client.changed().await.is_err() {
            break;
        }
    }
}
