//! Live event stream over a single long-lived HTTP response.
//!
//! The server answers one authenticated `GET` with a `text/event-stream`
//! body that never ends on its own. [`StreamClient::connect`] issues that
//! request on a background task, feeds every body chunk through a
//! [`FrameParser`], and forwards decoded messages, in order, to the
//! returned [`MessageStream`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use calsync_api::{StaticToken, StreamClient, StreamOptions, TransportConfig};
//! use futures_util::StreamExt;
//!
//! let url = "https://cal.example.com/v1/sse/events".parse()?;
//! let token = Arc::new(StaticToken::new("token".to_string()));
//! let client = StreamClient::from_transport(&TransportConfig::default(), url, token, StreamOptions::default())?;
//!
//! let mut messages = client.connect()?;
//! while let Some(message) = messages.next().await {
//!     println!("{:?}", message?);
//! }
//! ```

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use secrecy::ExposeSecret;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::auth::CredentialProvider;
use crate::error::Error;
use crate::frame::{FrameParser, decode_frame};
use crate::message::StreamMessage;
use crate::transport::TransportConfig;

// ── Channel capacity ─────────────────────────────────────────────────

const MESSAGE_CHANNEL_CAPACITY: usize = 256;

/// Item yielded by a [`MessageStream`].
pub type StreamItem = Result<StreamMessage, Error>;

// ── ConnectionState ──────────────────────────────────────────────────

/// Lifecycle of one stream connection.
///
/// `Idle → Connecting → Connected → Closed | Errored`. `Closed` and
/// `Errored` are final: a client never reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Closed,
    Errored,
}

impl ConnectionState {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }

    pub fn is_finished(self) -> bool {
        matches!(self, Self::Closed | Self::Errored)
    }
}

// ── StreamOptions ────────────────────────────────────────────────────

/// Tuning for a single stream connection.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// End the stream on the first malformed payload instead of reporting
    /// it and continuing. Default: `false`.
    pub fatal_decode_errors: bool,

    /// Messages buffered between the reader task and the consumer. When
    /// full, the reader stops pulling body chunks until the consumer
    /// catches up. Default: 256.
    pub channel_capacity: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            fatal_decode_errors: false,
            channel_capacity: MESSAGE_CHANNEL_CAPACITY,
        }
    }
}

// ── StreamClient ─────────────────────────────────────────────────────

/// Owns exactly one streaming connection.
///
/// Construct a new client to reconnect; the core applies no retry policy.
/// Dropping the client cancels its connection.
pub struct StreamClient {
    http: reqwest::Client,
    url: Url,
    credentials: Arc<dyn CredentialProvider>,
    options: StreamOptions,
    state: Arc<watch::Sender<ConnectionState>>,
    cancel: CancellationToken,
}

impl StreamClient {
    /// Create a client with a pre-built `reqwest::Client`.
    pub fn new(
        http: reqwest::Client,
        url: Url,
        credentials: Arc<dyn CredentialProvider>,
        options: StreamOptions,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            http,
            url,
            credentials,
            options,
            state: Arc::new(state),
            cancel: CancellationToken::new(),
        }
    }

    /// Create a client whose HTTP client is built from a `TransportConfig`.
    pub fn from_transport(
        transport: &TransportConfig,
        url: Url,
        credentials: Arc<dyn CredentialProvider>,
        options: StreamOptions,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::new(http, url, credentials, options))
    }

    /// The stream endpoint.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Observe connection state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Open the stream and spawn the reader task.
    ///
    /// Returns immediately; the request is issued in the background. Misuse
    /// is reported synchronously: [`Error::AlreadyConnected`] while a
    /// connection is open, [`Error::ClientClosed`] once it has ended, and
    /// [`Error::MissingCredentials`] when no token is available (the client
    /// stays idle in that case).
    pub fn connect(&self) -> Result<MessageStream, Error> {
        let token = self.credentials.bearer_token();

        let mut outcome = Ok(());
        self.state.send_if_modified(|state| {
            outcome = match (*state, &token) {
                (ConnectionState::Connecting | ConnectionState::Connected, _) => {
                    Err(Error::AlreadyConnected)
                }
                (ConnectionState::Closed | ConnectionState::Errored, _) => Err(Error::ClientClosed),
                (ConnectionState::Idle, None) => Err(Error::MissingCredentials),
                (ConnectionState::Idle, Some(_)) => {
                    *state = ConnectionState::Connecting;
                    return true;
                }
            };
            false
        });
        outcome?;
        let token = token.ok_or(Error::MissingCredentials)?;

        let request = self
            .http
            .get(self.url.clone())
            .bearer_auth(token.expose_secret())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");

        let (tx, rx) = mpsc::channel(self.options.channel_capacity.max(1));
        let state = Arc::clone(&self.state);
        let cancel = self.cancel.clone();
        let fatal_decode_errors = self.options.fatal_decode_errors;

        info!(url = %self.url, "opening event stream");
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => Ok(()),
                () = tx.closed() => {
                    debug!("message stream dropped by consumer");
                    Ok(())
                }
                result = read_stream(request, &state, &tx, fatal_decode_errors) => result,
            };
            finish(&state, &tx, &cancel, outcome).await;
        });

        Ok(MessageStream { rx })
    }

    /// Close the connection. Idempotent.
    ///
    /// Aborts the in-flight request and ends the message stream cleanly:
    /// a consumer waiting on the next message sees end-of-stream once any
    /// already-queued messages are drained.
    pub fn disconnect(&self) {
        let closed = self.state.send_if_modified(|state| {
            if state.is_finished() {
                false
            } else {
                *state = ConnectionState::Closed;
                true
            }
        });
        self.cancel.cancel();
        if closed {
            info!(url = %self.url, "event stream disconnected");
        }
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Reader task ──────────────────────────────────────────────────────

/// Issue the request and pump body chunks through the frame parser until
/// the body ends or a terminal error occurs.
async fn read_stream(
    request: reqwest::RequestBuilder,
    state: &watch::Sender<ConnectionState>,
    tx: &mpsc::Sender<StreamItem>,
    fatal_decode_errors: bool,
) -> Result<(), Error> {
    let mut response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(status, body));
    }
    debug!(%status, "event stream response received");

    let mut parser = FrameParser::new();

    while let Some(chunk) = response.chunk().await? {
        mark_connected(state);
        trace!(bytes = chunk.len(), "stream chunk");
        parser.push(&chunk);

        for frame in parser.frames() {
            match frame.and_then(|f| decode_frame(&f)) {
                Ok(Some(StreamMessage::Unknown { kind })) => {
                    warn!(kind = %kind, "skipping unknown stream message");
                }
                Ok(Some(message)) => {
                    debug!(kind = message.kind(), "stream message");
                    if tx.send(Ok(message)).await.is_err() {
                        return Ok(());
                    }
                }
                Ok(None) => trace!("frame without payload"),
                Err(e) if fatal_decode_errors => return Err(e),
                Err(e) => {
                    warn!(error = %e, "skipping malformed stream message");
                    if tx.send(Err(e)).await.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }

    debug!(buffered = parser.buffered(), "event stream body ended");
    Ok(())
}

fn mark_connected(state: &watch::Sender<ConnectionState>) {
    let changed = state.send_if_modified(|s| {
        if *s == ConnectionState::Connecting {
            *s = ConnectionState::Connected;
            true
        } else {
            false
        }
    });
    if changed {
        info!("event stream connected");
    }
}

/// Record the final state and, for a failure, hand the error to the consumer.
async fn finish(
    state: &watch::Sender<ConnectionState>,
    tx: &mpsc::Sender<StreamItem>,
    cancel: &CancellationToken,
    outcome: Result<(), Error>,
) {
    match outcome {
        Err(e) if !cancel.is_cancelled() => {
            warn!(error = %e, "event stream failed");
            state.send_replace(ConnectionState::Errored);
            let _ = tx.send(Err(e)).await;
        }
        _ => {
            state.send_if_modified(|s| {
                if s.is_finished() {
                    false
                } else {
                    *s = ConnectionState::Closed;
                    true
                }
            });
            debug!("event stream reader exiting");
        }
    }
}

fn status_error(status: reqwest::StatusCode, body: String) -> Error {
    match status.as_u16() {
        code @ (401 | 403) => Error::Authentication {
            status: code,
            message: if body.is_empty() {
                status.to_string()
            } else {
                body
            },
        },
        code => Error::Status { status: code, body },
    }
}

// ── MessageStream ────────────────────────────────────────────────────

/// Ordered, cancellable sequence of decoded messages from one connection.
///
/// Yields `Ok` messages in arrival order. Malformed payloads appear as
/// non-terminal `Err` items. A transport failure is the last item before
/// the stream ends. After [`StreamClient::disconnect`] the stream ends
/// cleanly. Dropping it stops the reader task.
pub struct MessageStream {
    rx: mpsc::Receiver<StreamItem>,
}

impl MessageStream {
    /// Wait for the next message. `None` means the stream has ended.
    pub async fn next_message(&mut self) -> Option<StreamItem> {
        self.rx.recv().await
    }
}

impl Stream for MessageStream {
    type Item = StreamItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_predicates() {
        assert!(ConnectionState::Connecting.is_open());
        assert!(ConnectionState::Connected.is_open());
        assert!(!ConnectionState::Idle.is_open());
        assert!(ConnectionState::Closed.is_finished());
        assert!(ConnectionState::Errored.is_finished());
        assert!(!ConnectionState::Connected.is_finished());
    }

    #[test]
    fn default_options() {
        let options = StreamOptions::default();
        assert!(!options.fatal_decode_errors);
        assert_eq!(options.channel_capacity, MESSAGE_CHANNEL_CAPACITY);
    }

    #[test]
    fn unauthorized_maps_to_authentication() {
        let err = status_error(reqwest::StatusCode::UNAUTHORIZED, String::new());
        assert!(matches!(err, Error::Authentication { status: 401, .. }));

        let err = status_error(reqwest::StatusCode::BAD_GATEWAY, "upstream".into());
        assert!(matches!(err, Error::Status { status: 502, .. }));
    }
}
