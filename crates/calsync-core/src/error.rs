// ── Core error types ──
//
// User-facing errors from calsync-core. Consumers never match on HTTP
// plumbing directly: the `From<calsync_api::Error>` impl folds transport
// failures into domain-level variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach event stream at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Not signed in -- no bearer token available")]
    MissingCredentials,

    #[error("Event stream request failed (HTTP {status}): {message}")]
    Stream { status: u16, message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Malformed stream message: {message}")]
    Protocol { message: String },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Live sync is already running")]
    AlreadyRunning,

    #[error("Stream client misuse: {message}")]
    Misuse { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` if reconnecting later has a chance of succeeding
    /// without user action.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } => true,
            Self::Stream { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the user has to sign in (again).
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed { .. } | Self::MissingCredentials
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<calsync_api::Error> for CoreError {
    fn from(err: calsync_api::Error) -> Self {
        use calsync_api::Error as Api;

        match err {
            Api::MissingCredentials => Self::MissingCredentials,
            Api::Authentication { status, message } => Self::AuthenticationFailed {
                message: format!("HTTP {status}: {message}"),
            },
            Api::Transport(e) => Self::ConnectionFailed {
                url: e
                    .url()
                    .map_or_else(|| "<unknown>".into(), ToString::to_string),
                reason: e.to_string(),
            },
            Api::InvalidUrl(e) => Self::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Tls(msg) => Self::Config {
                message: format!("TLS setup failed: {msg}"),
            },
            Api::Status { status, body } => Self::Stream {
                status,
                message: body,
            },
            Api::Decode { message, .. } => Self::Protocol { message },
            e @ (Api::AlreadyConnected | Api::ClientClosed) => Self::Misuse {
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_classify() {
        let err = CoreError::from(calsync_api::Error::Authentication {
            status: 401,
            message: "expired".into(),
        });
        assert!(err.is_auth());
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "Authentication failed: HTTP 401: expired");
    }

    #[test]
    fn server_errors_are_transient() {
        let err = CoreError::from(calsync_api::Error::Status {
            status: 503,
            body: "maintenance".into(),
        });
        assert!(err.is_transient());

        let err = CoreError::from(calsync_api::Error::Status {
            status: 404,
            body: String::new(),
        });
        assert!(!err.is_transient());
    }

    #[test]
    fn misuse_keeps_its_message() {
        let err = CoreError::from(calsync_api::Error::AlreadyConnected);
        assert!(matches!(err, CoreError::Misuse { ref message } if message.contains("already")));
    }
}
