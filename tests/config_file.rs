//! Integration tests for the TOML file -> env override -> Config pipeline.
//!
//! Environment lookups are injected so tests never touch process-wide
//! environment state.

use std::fs;

use chat_relay::config::{Config, ConfigError, KeySource, RawConfig};

fn lookup_from(pairs: Vec<(&'static str, &'static str)>) -> impl Fn(&str) -> Option<String> {
    move |name: &str| {
        pairs
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.to_string())
    }
}

#[test]
fn file_values_are_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("relay.toml");
    fs::write(
        &config_path,
        r#"
[server]
listen = "127.0.0.1:19876"

[upstream]
url = "http://localhost:9999/v1/chat/completions"
model = "file-model"
fallback_model = "file-fallback"
"#,
    )
    .unwrap();

    let raw = RawConfig::from_file(&config_path).unwrap();
    let (config, key_source) = Config::from_raw_with(raw, lookup_from(vec![])).unwrap();

    assert_eq!(config.server.listen, "127.0.0.1:19876");
    assert_eq!(config.upstream.url, "http://localhost:9999/v1/chat/completions");
    assert_eq!(config.upstream.model, "file-model");
    assert_eq!(config.upstream.effective_fallback(), Some("file-fallback"));
    assert_eq!(key_source, KeySource::None);
}

#[test]
fn api_key_reference_is_expanded() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("relay.toml");
    fs::write(&config_path, "[upstream]\napi_key = \"${RELAY_TEST_KEY}\"\n").unwrap();

    let raw = RawConfig::from_file(&config_path).unwrap();
    let (config, key_source) =
        Config::from_raw_with(raw, lookup_from(vec![("RELAY_TEST_KEY", "gsk-resolved")])).unwrap();

    assert_eq!(key_source, KeySource::EnvExpanded);
    assert_eq!(
        config.upstream.api_key.as_ref().unwrap().expose_secret(),
        "gsk-resolved"
    );
}

#[test]
fn environment_key_wins_over_file() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("relay.toml");
    fs::write(&config_path, "[upstream]\napi_key = \"from-file\"\n").unwrap();

    let raw = RawConfig::from_file(&config_path).unwrap();
    let (config, key_source) =
        Config::from_raw_with(raw, lookup_from(vec![("GROK_API_KEY", "from-env")])).unwrap();

    assert_eq!(key_source, KeySource::Environment("GROK_API_KEY".to_string()));
    assert_eq!(config.upstream.api_key.unwrap().expose_secret(), "from-env");
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    let err = Config::load(Some(missing.as_path())).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("nope.toml"));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("bad.toml");
    fs::write(&config_path, "[upstream\nmodel = ").unwrap();

    let err = RawConfig::from_file(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn unknown_key_type_is_a_parse_error() {
    let err = RawConfig::parse_str("[upstream]\ntimeout_secs = \"thirty\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn shipped_example_loads_without_environment() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config.example.toml");

    let raw = RawConfig::from_file(&path).unwrap();
    let (config, key_source) = Config::from_raw_with(raw, lookup_from(vec![])).unwrap();

    assert_eq!(key_source, KeySource::None);
    assert!(config.upstream.api_key.is_none());
    assert_eq!(config.server.listen, "0.0.0.0:5000");
}
