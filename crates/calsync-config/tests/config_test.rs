#![allow(clippy::unwrap_used)]
// Config loading against real files and environment overrides.
//
// Every test that loads config runs inside a figment `Jail` so environment
// overrides from one test never leak into another.

use std::path::Path;

use figment::Jail;
use pretty_assertions::assert_eq;

use calsync_config::{
    Config, ConfigError, Profile, load_config_from, save_config_to, stream_url,
};

const SAMPLE: &str = r#"
default_profile = "work"

[defaults]
connect_timeout = 5

[profiles.work]
server = "https://cal.example.com"
token_env = "WORK_CAL_TOKEN"

[profiles.local]
server = "http://localhost:8000"
stream_path = "/events"
insecure = true
"#;

#[test]
fn missing_file_yields_defaults() {
    Jail::expect_with(|_| {
        let cfg = load_config_from(Path::new("nope.toml")).unwrap();

        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.defaults.stream_path, "/v1/sse/events");
        assert_eq!(cfg.defaults.connect_timeout, 10);
        Ok(())
    });
}

#[test]
fn file_values_override_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", SAMPLE)?;
        let cfg = load_config_from(Path::new("config.toml")).unwrap();

        assert_eq!(cfg.default_profile.as_deref(), Some("work"));
        assert_eq!(cfg.defaults.connect_timeout, 5);
        assert_eq!(cfg.defaults.stream_path, "/v1/sse/events");

        let (name, work) = cfg.profile(None).unwrap();
        assert_eq!(name, "work");
        assert_eq!(work.token_env.as_deref(), Some("WORK_CAL_TOKEN"));

        let (_, local) = cfg.profile(Some("local")).unwrap();
        assert_eq!(
            stream_url(local, &cfg.defaults).unwrap().as_str(),
            "http://localhost:8000/events"
        );
        Ok(())
    });
}

#[test]
fn environment_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", SAMPLE)?;
        jail.set_env("CALSYNC_DEFAULTS__CONNECT_TIMEOUT", "30");
        jail.set_env("CALSYNC_DEFAULT_PROFILE", "local");
        jail.set_env("CALSYNC_PROFILES__LOCAL__FATAL_DECODE_ERRORS", "true");

        let cfg = load_config_from(Path::new("config.toml")).unwrap();

        assert_eq!(cfg.defaults.connect_timeout, 30);
        let (name, local) = cfg.profile(None).unwrap();
        assert_eq!(name, "local");
        assert_eq!(local.fatal_decode_errors, Some(true));
        assert_eq!(local.insecure, Some(true));
        Ok(())
    });
}

#[test]
fn malformed_file_is_an_error() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[profiles.work]\nserver = 42\n")?;

        let err = load_config_from(Path::new("config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Figment(_)));
        Ok(())
    });
}

#[test]
fn saved_config_loads_back() {
    Jail::expect_with(|_| {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                server: "https://cal.example.com".into(),
                token: Some("plain".into()),
                ..Profile::default()
            },
        );
        save_config_to(&cfg, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[profiles.default]"));
        assert_eq!(load_config_from(&path).unwrap(), cfg);
        Ok(())
    });
}
