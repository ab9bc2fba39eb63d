//! CLI configuration: a thin wrapper around `calsync_config`.
//!
//! Adds the resolution that respects `GlobalOpts` flag overrides
//! (--server, --token, --insecure, --connect-timeout).

use calsync_core::SyncConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use calsync_config::{
    Config, Profile, config_path, load_config, load_config_or_default, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Everything a stream command needs to start.
#[derive(Debug)]
pub struct Resolved {
    pub profile_name: String,
    pub sync: SyncConfig,
}

/// Build a `SyncConfig` from the config file, active profile and CLI
/// overrides.
///
/// A missing profile is only an error when `--server` is absent too: the
/// flags alone describe a complete ad-hoc connection.
pub fn resolve(
    global: &GlobalOpts,
    cfg: &Config,
    fatal_decode_errors: bool,
) -> Result<Resolved, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let (mut profile, from_file) = match cfg.profiles.get(&profile_name) {
        Some(p) => (p.clone(), true),
        None => {
            let Some(server) = global.server.clone() else {
                if global.profile.is_some() {
                    return Err(CliError::ProfileNotFound {
                        name: profile_name,
                        available: available_profiles(cfg),
                    });
                }
                return Err(CliError::NoConfig {
                    path: config_path().display().to_string(),
                });
            };
            let profile = Profile {
                server,
                ..Profile::default()
            };
            (profile, false)
        }
    };

    apply_overrides(&mut profile, global, fatal_decode_errors);

    let token = if from_file {
        let (token, source) =
            calsync_config::resolve_token(&profile, &profile_name, global.token.as_deref())
                .map_err(|e| CliError::from(e).for_profile(&profile_name))?;
        tracing::debug!(profile = %profile_name, source = %source, "resolved bearer token");
        token
    } else {
        global
            .token
            .clone()
            .map(secrecy::SecretString::from)
            .ok_or_else(|| CliError::NoCredentials {
                profile: profile_name.clone(),
            })?
    };

    let sync = calsync_config::profile_to_sync_config(&profile, &cfg.defaults, token)?;
    Ok(Resolved { profile_name, sync })
}

/// Flags beat profile values.
fn apply_overrides(profile: &mut Profile, global: &GlobalOpts, fatal_decode_errors: bool) {
    if let Some(ref server) = global.server {
        profile.server.clone_from(server);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(secs) = global.connect_timeout {
        profile.connect_timeout = Some(secs);
    }
    if fatal_decode_errors {
        profile.fatal_decode_errors = Some(true);
    }
}

/// Comma-separated profile names for help text.
pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
