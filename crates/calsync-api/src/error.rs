use thiserror::Error;

/// Top-level error type for the `calsync-api` crate.
///
/// Covers every failure mode of the live stream: credentials, transport,
/// HTTP status, frame decoding, and client misuse. `calsync-core` maps these
/// into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The credential provider had no bearer token to attach.
    #[error("No bearer token available -- sign in first")]
    MissingCredentials,

    /// The server rejected the bearer token (HTTP 401/403).
    #[error("Authentication failed (HTTP {status}): {message}")]
    Authentication { status: u16, message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, reset, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Non-success status on the streaming request.
    #[error("Stream request failed (HTTP {status}): {body}")]
    Status { status: u16, body: String },

    // ── Data ────────────────────────────────────────────────────────
    /// A complete frame carried a payload that is not a valid message.
    #[error("Failed to decode stream message: {message}")]
    Decode { message: String, payload: String },

    // ── Misuse ──────────────────────────────────────────────────────
    /// `connect()` called while a connection is already open or opening.
    #[error("Stream client is already connected")]
    AlreadyConnected,

    /// `connect()` called on a client whose connection has ended.
    #[error("Stream client is closed -- construct a new client to reconnect")]
    ClientClosed,
}

impl Error {
    /// Returns `true` if this error indicates the token is missing or rejected
    /// and signing in again might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::MissingCredentials | Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth reconnecting for.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_body(),
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` for a malformed payload inside an otherwise well-formed frame.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// Returns `true` for programmer errors reported synchronously by the client.
    pub fn is_misuse(&self) -> bool {
        matches!(self, Self::AlreadyConnected | Self::ClientClosed)
    }

    /// Returns `true` if the connection cannot continue after this error.
    pub fn is_terminal(&self) -> bool {
        !self.is_decode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_are_not_terminal() {
        let err = Error::Decode {
            message: "expected value".into(),
            payload: "{".into(),
        };
        assert!(err.is_decode());
        assert!(!err.is_terminal());
        assert!(!err.is_misuse());
    }

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Status {
            status: 503,
            body: String::new(),
        };
        assert!(err.is_transient());
        assert!(err.is_terminal());

        let err = Error::Status {
            status: 404,
            body: String::new(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn misuse_classification() {
        assert!(Error::AlreadyConnected.is_misuse());
        assert!(Error::ClientClosed.is_misuse());
        assert!(Error::MissingCredentials.is_auth_expired());
    }
}
