//! Configuration for calsync.
//!
//! TOML profiles, bearer token resolution (env + keyring + plaintext),
//! and translation to `calsync_core::SyncConfig`. The CLI layers its
//! flag overrides on top.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use calsync_api::{StaticToken, StreamOptions, TlsMode, TransportConfig};
use calsync_core::SyncConfig;

const KEYRING_SERVICE: &str = "calsync";
const ENV_PREFIX: &str = "CALSYNC_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("no token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named on the command line.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

/// Values every profile falls back to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_stream_path")]
    pub stream_path: String,

    #[serde(default)]
    pub insecure: bool,

    /// Seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    #[serde(default)]
    pub fatal_decode_errors: bool,

    /// `auto`, `always` or `never`.
    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            stream_path: default_stream_path(),
            insecure: false,
            connect_timeout: default_connect_timeout(),
            fatal_decode_errors: false,
            color: default_color(),
        }
    }
}

fn default_stream_path() -> String {
    "/v1/sse/events".into()
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_color() -> String {
    "auto".into()
}

/// A named calendar server profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Server base URL (e.g., "https://cal.example.com").
    pub server: String,

    /// Override the stream endpoint path.
    pub stream_path: Option<String>,

    /// Bearer token (plaintext -- prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable holding the bearer token.
    pub token_env: Option<String>,

    /// Path to a custom CA certificate (PEM).
    pub ca_cert: Option<PathBuf>,

    pub insecure: Option<bool>,

    /// Seconds.
    pub connect_timeout: Option<u64>,

    pub fatal_decode_errors: Option<bool>,
}

impl Config {
    /// Pick a profile: the explicit `name`, else `default_profile`, else
    /// `"default"`.
    pub fn profile<'a>(&'a self, name: Option<&'a str>) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|p| (name, p))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "calsync", "calsync").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("calsync");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path` (missing file is fine) + environment.
///
/// Environment keys use `__` as the nesting separator, e.g.
/// `CALSYNC_PROFILES__WORK__SERVER` or `CALSYNC_DEFAULTS__CONNECT_TIMEOUT`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is invalid.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to the canonical path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

/// Where a resolved token came from. Shown by `config show`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    Flag,
    Env(String),
    Keyring,
    Plaintext,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag => f.write_str("command line"),
            Self::Env(var) => write!(f, "env ${var}"),
            Self::Keyring => f.write_str("keyring"),
            Self::Plaintext => f.write_str("config file"),
        }
    }
}

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/token"),
    )?)
}

/// Resolve the bearer token: CLI flag → `token_env` → keyring → plaintext.
pub fn resolve_token(
    profile: &Profile,
    profile_name: &str,
    flag: Option<&str>,
) -> Result<(SecretString, TokenSource), ConfigError> {
    resolve_token_with(
        profile,
        profile_name,
        flag,
        |var| std::env::var(var).ok(),
        |name| keyring_entry(name).ok()?.get_password().ok(),
    )
}

/// [`resolve_token`] with injectable env and keyring lookups.
pub fn resolve_token_with(
    profile: &Profile,
    profile_name: &str,
    flag: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<(SecretString, TokenSource), ConfigError> {
    // 1. Explicit flag
    if let Some(token) = flag {
        return Ok((SecretString::from(token.to_owned()), TokenSource::Flag));
    }

    // 2. Profile's token_env → env var lookup
    if let Some(ref var) = profile.token_env {
        if let Some(token) = env(var) {
            return Ok((SecretString::from(token), TokenSource::Env(var.clone())));
        }
        debug!(var = %var, "token_env set but variable is empty or missing");
    }

    // 3. System keyring
    if let Some(token) = keyring(profile_name) {
        return Ok((SecretString::from(token), TokenSource::Keyring));
    }

    // 4. Plaintext in config
    if let Some(ref token) = profile.token {
        return Ok((SecretString::from(token.clone()), TokenSource::Plaintext));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a token in the OS keyring for `profile_name`.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(token)?;
    Ok(())
}

// ── Translation to runtime config ───────────────────────────────────

/// Full stream URL for a profile: `server` joined with the stream path.
pub fn stream_url(profile: &Profile, defaults: &Defaults) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::Validation {
        field: "server".into(),
        reason,
    };

    let mut base: Url = profile
        .server
        .parse()
        .map_err(|e| invalid(format!("invalid URL '{}': {e}", profile.server)))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(invalid(format!(
            "expected http or https, got '{}'",
            base.scheme()
        )));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    let stream_path = profile
        .stream_path
        .as_deref()
        .unwrap_or(&defaults.stream_path);
    base.join(stream_path.trim_start_matches('/'))
        .map_err(|e| ConfigError::Validation {
            field: "stream_path".into(),
            reason: format!("'{stream_path}': {e}"),
        })
}

/// Transport settings for a profile, falling back to `defaults`.
pub fn transport_for(profile: &Profile, defaults: &Defaults) -> TransportConfig {
    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };

    TransportConfig {
        tls,
        connect_timeout: Duration::from_secs(
            profile.connect_timeout.unwrap_or(defaults.connect_timeout),
        ),
        ..TransportConfig::default()
    }
}

/// Build a `SyncConfig` from a profile and an already-resolved token.
pub fn profile_to_sync_config(
    profile: &Profile,
    defaults: &Defaults,
    token: SecretString,
) -> Result<SyncConfig, ConfigError> {
    let url = stream_url(profile, defaults)?;
    let mut config = SyncConfig::new(url, Arc::new(StaticToken::new(token)));
    config.transport = transport_for(profile, defaults);
    config.options = StreamOptions {
        fatal_decode_errors: profile
            .fatal_decode_errors
            .unwrap_or(defaults.fatal_decode_errors),
        ..StreamOptions::default()
    };
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use calsync_api::CredentialProvider;
    use secrecy::ExposeSecret;

    use super::*;

    fn profile(server: &str) -> Profile {
        Profile {
            server: server.into(),
            ..Profile::default()
        }
    }

    #[test]
    fn stream_url_joins_default_path() {
        let url = stream_url(&profile("https://cal.example.com"), &Defaults::default()).unwrap();
        assert_eq!(url.as_str(), "https://cal.example.com/v1/sse/events");
    }

    #[test]
    fn stream_url_keeps_base_path() {
        let mut p = profile("https://example.com/calendar");
        p.stream_path = Some("/events/stream".into());
        let url = stream_url(&p, &Defaults::default()).unwrap();
        assert_eq!(url.as_str(), "https://example.com/calendar/events/stream");
    }

    #[test]
    fn stream_url_rejects_bad_server() {
        let err = stream_url(&profile("not a url"), &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "server"));

        let err = stream_url(&profile("ftp://cal.example.com"), &Defaults::default()).unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn transport_prefers_insecure_over_ca() {
        let mut p = profile("https://cal.example.com");
        p.ca_cert = Some(PathBuf::from("/etc/ca.pem"));
        assert_eq!(
            transport_for(&p, &Defaults::default()).tls,
            TlsMode::CustomCa(PathBuf::from("/etc/ca.pem"))
        );

        p.insecure = Some(true);
        assert_eq!(
            transport_for(&p, &Defaults::default()).tls,
            TlsMode::DangerAcceptInvalid
        );
    }

    #[test]
    fn transport_timeout_falls_back_to_defaults() {
        let defaults = Defaults {
            connect_timeout: 3,
            ..Defaults::default()
        };
        let mut p = profile("https://cal.example.com");
        assert_eq!(transport_for(&p, &defaults).connect_timeout, Duration::from_secs(3));

        p.connect_timeout = Some(20);
        assert_eq!(transport_for(&p, &defaults).connect_timeout, Duration::from_secs(20));
    }

    #[test]
    fn token_resolution_order() {
        let mut p = profile("https://cal.example.com");
        p.token = Some("plain".into());
        p.token_env = Some("CAL_TOKEN".into());

        let env = |var: &str| (var == "CAL_TOKEN").then(|| "from-env".to_owned());
        let keyring = |name: &str| (name == "work").then(|| "from-keyring".to_owned());
        let none = |_: &str| None;

        let (token, source) = resolve_token_with(&p, "work", Some("flag"), env, keyring).unwrap();
        assert_eq!((token.expose_secret(), source), ("flag", TokenSource::Flag));

        let (token, source) = resolve_token_with(&p, "work", None, env, keyring).unwrap();
        assert_eq!(
            (token.expose_secret(), source),
            ("from-env", TokenSource::Env("CAL_TOKEN".into()))
        );

        let (token, source) = resolve_token_with(&p, "work", None, none, keyring).unwrap();
        assert_eq!((token.expose_secret(), source), ("from-keyring", TokenSource::Keyring));

        let (token, source) = resolve_token_with(&p, "home", None, none, keyring).unwrap();
        assert_eq!((token.expose_secret(), source), ("plain", TokenSource::Plaintext));

        p.token = None;
        let err = resolve_token_with(&p, "home", None, none, none).unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { ref profile } if profile == "home"));
    }

    #[test]
    fn profile_selection() {
        let mut cfg = Config::default();
        cfg.profiles.insert("default".into(), profile("https://a.example.com"));
        cfg.profiles.insert("work".into(), profile("https://b.example.com"));

        assert_eq!(cfg.profile(None).unwrap().0, "default");
        assert_eq!(cfg.profile(Some("work")).unwrap().1.server, "https://b.example.com");

        cfg.default_profile = Some("work".into());
        assert_eq!(cfg.profile(None).unwrap().0, "work");

        assert!(matches!(
            cfg.profile(Some("missing")),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn sync_config_carries_profile_settings() {
        let mut p = profile("http://localhost:8000");
        p.fatal_decode_errors = Some(true);

        let sync = profile_to_sync_config(&p, &Defaults::default(), SecretString::from("t".to_owned()))
            .unwrap();
        assert_eq!(sync.url.as_str(), "http://localhost:8000/v1/sse/events");
        assert!(sync.options.fatal_decode_errors);
        assert!(sync.credentials.bearer_token().is_some());
    }
}
