//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use calsync_config::ConfigError;
use calsync_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the event stream at {url}")]
    #[diagnostic(
        code(calsync::connection_failed),
        help(
            "Check that the server is running and the URL is right.\n\
             Self-signed certificate? Try --insecure (-k) or set ca_cert in your profile."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Event stream ended with an error: {reason}")]
    #[diagnostic(
        code(calsync::stream_failed),
        help("Run again with --reconnect to keep following the stream.")
    )]
    StreamFailed { reason: String },

    #[error("Event stream rejected the request (HTTP {status})")]
    #[diagnostic(code(calsync::stream_rejected))]
    StreamRejected { status: u16, message: String },

    #[error("Malformed message on the event stream: {message}")]
    #[diagnostic(
        code(calsync::protocol),
        help("Drop --fatal-decode-errors to skip malformed messages instead.")
    )]
    Protocol { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(calsync::auth_failed),
        help(
            "The bearer token was rejected or has expired.\n\
             Run: calsync config set-token --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No token configured for profile '{profile}'")]
    #[diagnostic(
        code(calsync::no_credentials),
        help(
            "Configure one with: calsync config init\n\
             Or pass --token / set CALSYNC_TOKEN."
        )
    )]
    NoCredentials { profile: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(calsync::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: calsync config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No server configured")]
    #[diagnostic(
        code(calsync::no_config),
        help(
            "Create a profile with: calsync config init\n\
             Or pass --server and --token.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(calsync::config))]
    Config { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(calsync::validation))]
    Validation { field: String, reason: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Timed out after {seconds}s waiting for the stream to connect")]
    #[diagnostic(
        code(calsync::timeout),
        help("Increase it with --timeout or check the server's responsiveness.")
    )]
    Timeout { seconds: u64 },

    #[error("Interrupted")]
    #[diagnostic(code(calsync::interrupted))]
    Interrupted,

    #[error("{message}")]
    #[diagnostic(code(calsync::internal))]
    Internal { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(calsync::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(calsync::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. }
            | Self::StreamFailed { .. }
            | Self::StreamRejected { .. }
            | Self::Protocol { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NoConfig { .. } => exit_code::USAGE,
            Self::Interrupted => exit_code::INTERRUPTED,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the active profile name to an auth failure.
    pub fn for_profile(self, name: &str) -> Self {
        match self {
            Self::AuthFailed { message, .. } => Self::AuthFailed {
                profile: name.into(),
                message,
            },
            Self::NoCredentials { .. } => Self::NoCredentials {
                profile: name.into(),
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },

            CoreError::AuthenticationFailed { message } => Self::AuthFailed {
                profile: "default".into(),
                message,
            },

            CoreError::MissingCredentials => Self::NoCredentials {
                profile: "default".into(),
            },

            CoreError::Stream { status, message } => Self::StreamRejected { status, message },

            CoreError::Protocol { message } => Self::Protocol { message },

            CoreError::Config { message } => Self::Config { message },

            err @ (CoreError::AlreadyRunning | CoreError::Misuse { .. }) => Self::Internal {
                message: err.to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },

            ConfigError::UnknownProfile { name } => Self::ProfileNotFound {
                name,
                available: "(see: calsync config profiles)".into(),
            },

            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },

            ConfigError::Io(e) => Self::Io(e),

            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (
                CoreError::ConnectionFailed {
                    url: "http://localhost".into(),
                    reason: "refused".into(),
                },
                exit_code::CONNECTION,
            ),
            (
                CoreError::AuthenticationFailed {
                    message: "HTTP 401: expired".into(),
                },
                exit_code::AUTH,
            ),
            (CoreError::MissingCredentials, exit_code::AUTH),
            (
                CoreError::Stream {
                    status: 503,
                    message: "busy".into(),
                },
                exit_code::CONNECTION,
            ),
            (CoreError::AlreadyRunning, exit_code::GENERAL),
        ];
        for (core, code) in cases {
            assert_eq!(CliError::from(core).exit_code(), code);
        }
    }

    #[test]
    fn config_errors_keep_their_meaning() {
        let err = CliError::from(ConfigError::UnknownProfile {
            name: "work".into(),
        });
        assert!(matches!(err, CliError::ProfileNotFound { ref name, .. } if name == "work"));
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);

        let err = CliError::from(ConfigError::Validation {
            field: "server".into(),
            reason: "expected http or https".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn for_profile_names_the_profile() {
        let err = CliError::from(CoreError::AuthenticationFailed {
            message: "nope".into(),
        })
        .for_profile("work");
        assert!(err.to_string().contains("nope"));
        let CliError::AuthFailed { profile, .. } = err else {
            panic!("expected AuthFailed");
        };
        assert_eq!(profile, "work");

        let err = CliError::Timeout { seconds: 3 }.for_profile("work");
        assert_eq!(err.exit_code(), exit_code::TIMEOUT);
    }
}
