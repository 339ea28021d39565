//! Tests for config file resolution and loading
//!
//! Uses serial_test because the resolver reads process environment variables.

use clipq_common::config::{load_or_default, load_toml, resolve_config_path};
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::path::Path;

const ENV_VAR: &str = "CLIPQ_TEST_CONFIG";

#[derive(Debug, Deserialize, Default, PartialEq)]
struct SampleConfig {
    #[serde(default)]
    port: u16,
    #[serde(default)]
    name: String,
}

#[test]
#[serial]
fn test_cli_argument_wins_over_environment() {
    env::set_var(ENV_VAR, "/from/env.toml");

    let resolved = resolve_config_path(Some(Path::new("/from/cli.toml")), ENV_VAR);
    assert_eq!(resolved.unwrap(), Path::new("/from/cli.toml"));

    env::remove_var(ENV_VAR);
}

#[test]
#[serial]
fn test_environment_used_without_cli_argument() {
    env::set_var(ENV_VAR, "/from/env.toml");

    let resolved = resolve_config_path(None, ENV_VAR);
    assert_eq!(resolved.unwrap(), Path::new("/from/env.toml"));

    env::remove_var(ENV_VAR);
}

#[test]
#[serial]
fn test_blank_environment_is_ignored() {
    env::set_var(ENV_VAR, "   ");

    let resolved = resolve_config_path(None, ENV_VAR);
    // Falls through to the platform directory, which only counts if it exists
    if let Some(path) = resolved {
        assert!(path.exists());
    }

    env::remove_var(ENV_VAR);
}

#[test]
fn test_load_toml_parses_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = 5000\nname = \"clipq\"\n").unwrap();

    let config: SampleConfig = load_toml(&path).unwrap();
    assert_eq!(config.port, 5000);
    assert_eq!(config.name, "clipq");
}

#[test]
fn test_load_toml_reports_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = \"not a number\"\n").unwrap();

    let result: clipq_common::Result<SampleConfig> = load_toml(&path);
    assert!(matches!(result, Err(clipq_common::Error::Config(_))));
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    env::remove_var(ENV_VAR);
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    let config: SampleConfig = load_or_default(Some(&missing), ENV_VAR).unwrap();
    assert_eq!(config, SampleConfig::default());
}
